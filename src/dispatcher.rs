use crate::{
    envelope::{self, RequestEnvelope, ResponseEnvelope},
    error::DispatchError,
    implementation::{Body, SyncBody},
    procedure::CallingConvention,
    schema::Schema,
    transport::{Handler, Reply},
    types::Kwargs,
};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Serves one procedure of one implementation instance.
///
/// Decodes the request envelope, binds positional arguments, validates them
/// against the cached [`Schema`], invokes the bound body and wraps the result.
pub struct Dispatcher<S> {
    instance: Arc<S>,
    schema: Arc<Schema>,
    body: Body<S>,
}

impl<S> Dispatcher<S>
where
    S: Send + Sync + 'static,
{
    pub fn new(instance: Arc<S>, schema: Arc<Schema>, body: Body<S>) -> Self {
        Self {
            instance,
            schema,
            body,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn convention(&self) -> CallingConvention {
        self.body.convention()
    }

    fn prepare(&self, bytes: &[u8]) -> Result<Kwargs, DispatchError> {
        let RequestEnvelope { args, kwargs } =
            envelope::decode(bytes).map_err(DispatchError::Decode)?;
        let kwargs = self.schema.bind(args, kwargs)?;
        self.schema.validate(kwargs)
    }

    pub async fn dispatch(&self, bytes: &[u8]) -> Result<ResponseEnvelope, DispatchError> {
        match &self.body {
            Body::Sync(f) => self.dispatch_sync(f, bytes),
            Body::Async(f) => {
                let kwargs = self.prepare(bytes)?;
                let data = f(self.instance.clone(), kwargs).await?;
                Ok(ResponseEnvelope { data })
            }
        }
    }

    fn dispatch_sync(&self, f: &SyncBody<S>, bytes: &[u8]) -> Result<ResponseEnvelope, DispatchError> {
        let kwargs = self.prepare(bytes)?;
        let data = f(self.instance.as_ref(), kwargs)?;
        Ok(ResponseEnvelope { data })
    }

    /// Erase into a transport [`Handler`] of the procedure's own calling convention.
    pub fn into_handler(self) -> Handler {
        match self.body.clone() {
            Body::Sync(f) => Handler::Sync(Arc::new(move |bytes: &[u8]| {
                let result = self.dispatch_sync(&f, bytes);
                reply(&self.schema, result)
            })),
            Body::Async(_) => {
                let this = Arc::new(self);
                Handler::Async(Arc::new(move |bytes: Vec<u8>| -> BoxFuture<'static, Reply> {
                    let this = this.clone();
                    Box::pin(async move {
                        let result = this.dispatch(&bytes).await;
                        reply(&this.schema, result)
                    })
                }))
            }
        }
    }
}

fn reply(schema: &Schema, result: Result<ResponseEnvelope, DispatchError>) -> Reply {
    let encoded = result.and_then(|response| {
        serde_json::to_vec(&response).map_err(DispatchError::Encode)
    });
    match encoded {
        Ok(body) => Reply::new(200, body),
        Err(err) => {
            tracing::debug!(
                interface = schema.interface(),
                procedure = schema.procedure(),
                status = err.status(),
                "dispatch failed: {err}"
            );
            Reply::detail(err.status(), err)
        }
    }
}
