use crate::{
    error::{DispatchError, ProcedureError},
    procedure::{CallingConvention, Interface},
    types::{Kwargs, Value},
};
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use std::{collections::BTreeMap, future::Future, sync::Arc};

pub type DispatchResult = Result<Value, DispatchError>;

pub(crate) type SyncBody<S> = Arc<dyn Fn(&S, Kwargs) -> DispatchResult + Send + Sync>;
pub(crate) type AsyncBody<S> =
    Arc<dyn Fn(Arc<S>, Kwargs) -> BoxFuture<'static, DispatchResult> + Send + Sync>;

/// A procedure body bound by an implementation, with its calling convention.
pub enum Body<S> {
    Sync(SyncBody<S>),
    Async(AsyncBody<S>),
}

impl<S> Body<S> {
    pub fn convention(&self) -> CallingConvention {
        match self {
            Body::Sync(_) => CallingConvention::Sync,
            Body::Async(_) => CallingConvention::Async,
        }
    }
}

impl<S> Clone for Body<S> {
    fn clone(&self) -> Self {
        match self {
            Body::Sync(f) => Body::Sync(f.clone()),
            Body::Async(f) => Body::Async(f.clone()),
        }
    }
}

/// The procedure bodies an implementation defines itself.
///
/// A procedure of the interface without an entry here is considered inherited
/// unchanged from the interface.
pub struct Bindings<S> {
    bodies: BTreeMap<String, Body<S>>,
}

impl<S> Default for Bindings<S> {
    fn default() -> Self {
        Self {
            bodies: BTreeMap::new(),
        }
    }
}

impl<S> Bindings<S>
where
    S: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a synchronous body. Its arguments are deserialized from the
    /// validated keyword mapping.
    pub fn sync<A, R, F>(&mut self, name: &str, f: F) -> &mut Self
    where
        A: DeserializeOwned,
        R: Serialize,
        F: Fn(&S, A) -> Result<R, ProcedureError> + Send + Sync + 'static,
    {
        let procedure = name.to_owned();
        let body = move |this: &S, kwargs: Kwargs| -> DispatchResult {
            let args = from_kwargs(&procedure, kwargs)?;
            let ret = f(this, args).map_err(|source| DispatchError::Procedure {
                procedure: procedure.clone(),
                source,
            })?;
            serde_json::to_value(ret).map_err(DispatchError::Encode)
        };
        self.insert(name, Body::Sync(Arc::new(body)))
    }

    /// Bind an asynchronous body.
    pub fn asynchronous<A, R, F, Fut>(&mut self, name: &str, f: F) -> &mut Self
    where
        A: DeserializeOwned,
        R: Serialize,
        F: Fn(Arc<S>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ProcedureError>> + Send + 'static,
    {
        let procedure = name.to_owned();
        let body = move |this: Arc<S>, kwargs: Kwargs| -> BoxFuture<'static, DispatchResult> {
            let call = from_kwargs(&procedure, kwargs).map(|args| f(this, args));
            let procedure = procedure.clone();
            Box::pin(async move {
                let ret = call?
                    .await
                    .map_err(|source| DispatchError::Procedure { procedure, source })?;
                serde_json::to_value(ret).map_err(DispatchError::Encode)
            })
        };
        self.insert(name, Body::Async(Arc::new(body)))
    }

    fn insert(&mut self, name: &str, body: Body<S>) -> &mut Self {
        if self.bodies.insert(name.to_owned(), body).is_some() {
            tracing::warn!(procedure = name, "procedure bound twice, keeping the last body");
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Body<S>> {
        self.bodies.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bodies.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bodies.keys().map(String::as_str)
    }
}

fn from_kwargs<A: DeserializeOwned>(procedure: &str, kwargs: Kwargs) -> Result<A, DispatchError> {
    serde_json::from_value(Value::Object(kwargs)).map_err(|source| DispatchError::Binding {
        procedure: procedure.to_owned(),
        source,
    })
}

/// A concrete type serving the procedures of an [`Interface`].
pub trait Implementation: Send + Sync + Sized + 'static {
    type Interface: Interface;

    /// Bind a body for every procedure this type implements.
    fn bind(bindings: &mut Bindings<Self>);

    fn bindings() -> Bindings<Self> {
        let mut bindings = Bindings::new();
        Self::bind(&mut bindings);
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    struct Counter {
        step: i64,
    }

    #[derive(Deserialize)]
    struct Bump {
        n: i64,
    }

    fn kwargs(value: Value) -> Kwargs {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn bindings() -> Bindings<Counter> {
        let mut bindings = Bindings::new();
        bindings
            .sync("bump", |this: &Counter, Bump { n }| Ok(n + this.step))
            .asynchronous("later", |this: Arc<Counter>, Bump { n }| async move {
                if n < 0 {
                    return Err(ProcedureError::new("negative"));
                }
                Ok(json!({"value": n * this.step}))
            });
        bindings
    }

    #[test]
    fn records_conventions() {
        let bindings = bindings();
        assert_eq!(bindings.get("bump").unwrap().convention(), CallingConvention::Sync);
        assert_eq!(bindings.get("later").unwrap().convention(), CallingConvention::Async);
        assert!(!bindings.contains("reset"));
        assert_eq!(bindings.names().collect::<Vec<_>>(), vec!["bump", "later"]);
    }

    #[tokio::test]
    async fn bodies_deserialize_arguments() {
        let bindings = bindings();
        let counter = Arc::new(Counter { step: 10 });

        let Some(Body::Sync(bump)) = bindings.get("bump") else {
            panic!("bump is sync");
        };
        assert_eq!(bump(counter.as_ref(), kwargs(json!({"n": 1}))).unwrap(), json!(11));

        let Some(Body::Async(later)) = bindings.get("later") else {
            panic!("later is async");
        };
        assert_eq!(
            later(counter.clone(), kwargs(json!({"n": 2}))).await.unwrap(),
            json!({"value": 20})
        );
        let err = later(counter.clone(), kwargs(json!({"n": -1}))).await.unwrap_err();
        assert!(matches!(err, DispatchError::Procedure { ref procedure, .. } if procedure == "later"));

        let err = bump(counter.as_ref(), kwargs(json!({"m": 1}))).unwrap_err();
        assert!(matches!(err, DispatchError::Binding { ref procedure, .. } if procedure == "bump"));
        assert_eq!(err.status(), 422);
    }

    #[derive(Deserialize)]
    struct Shift {
        by: u8,
    }

    #[tokio::test]
    async fn arguments_outside_the_rust_type_are_rejected_before_the_body() {
        let mut bindings = Bindings::<Counter>::new();
        bindings
            .sync("shift", |_: &Counter, Shift { by }| -> Result<u8, ProcedureError> {
                panic!("body ran with {by}")
            })
            .asynchronous("shift_later", |_: Arc<Counter>, Shift { by }| async move {
                Ok::<_, ProcedureError>(by)
            });
        let counter = Arc::new(Counter { step: 1 });

        let Some(Body::Sync(shift)) = bindings.get("shift") else {
            panic!("shift is sync");
        };
        let err = shift(counter.as_ref(), kwargs(json!({"by": 300}))).unwrap_err();
        assert_eq!(err.status(), 422);
        assert!(err.to_string().starts_with("invalid arguments for procedure `shift`"));

        let Some(Body::Async(shift_later)) = bindings.get("shift_later") else {
            panic!("shift_later is async");
        };
        let err = shift_later(counter, kwargs(json!({"by": -1}))).await.unwrap_err();
        assert!(matches!(err, DispatchError::Binding { .. }));
    }
}
