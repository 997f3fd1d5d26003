//! Validation schemas derived from procedure declarations.

use crate::{
    error::DispatchError,
    procedure::{Param, ProcedureDescriptor},
    types::{Kwargs, Value},
};
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

/// Validator and coercer for the arguments of one procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    interface: String,
    procedure: String,
    params: Vec<Param>,
}

impl Schema {
    pub fn derive(interface: &str, procedure: &ProcedureDescriptor) -> Self {
        Self {
            interface: interface.to_owned(),
            procedure: procedure.name().to_owned(),
            params: procedure.params().to_vec(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Declared parameter names, in positional order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    /// Bind positional arguments to declared names. A name that is also passed
    /// by keyword keeps the keyword value.
    pub fn bind(&self, args: Vec<Value>, mut kwargs: Kwargs) -> Result<Kwargs, DispatchError> {
        if args.len() > self.params.len() {
            return Err(DispatchError::TooManyArguments {
                interface: self.interface.clone(),
                procedure: self.procedure.clone(),
                expected: self.params.len(),
                given: args.len(),
            });
        }
        for (param, arg) in self.params.iter().zip(args) {
            kwargs.entry(param.name.clone()).or_insert(arg);
        }
        Ok(kwargs)
    }

    /// Fill defaults, coerce every declared parameter and drop undeclared keys.
    /// The result follows declaration order.
    pub fn validate(&self, mut kwargs: Kwargs) -> Result<Kwargs, DispatchError> {
        let mut validated = Kwargs::with_capacity(self.params.len());
        for param in &self.params {
            let value = match (kwargs.remove(&param.name), &param.default) {
                (Some(value), _) => {
                    param
                        .ty
                        .coerce(value)
                        .map_err(|source| DispatchError::Validation {
                            interface: self.interface.clone(),
                            procedure: self.procedure.clone(),
                            param: param.name.clone(),
                            source,
                        })?
                }
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(DispatchError::MissingArgument {
                        interface: self.interface.clone(),
                        procedure: self.procedure.clone(),
                        param: param.name.clone(),
                    })
                }
            };
            validated.insert(param.name.clone(), value);
        }
        if !kwargs.is_empty() {
            tracing::debug!(
                interface = %self.interface,
                procedure = %self.procedure,
                ignored = ?kwargs.keys().collect::<Vec<_>>(),
                "dropping undeclared arguments"
            );
        }
        Ok(validated)
    }
}

/// Process-lifetime cache of schemas keyed by (interface, procedure).
///
/// Populated while clients and servers are set up; handlers keep their own
/// `Arc<Schema>` so nothing reads the registry at request time.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<(String, String), Arc<Schema>>>,
    derivations: AtomicUsize,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, interface: &str, procedure: &str) -> Option<Arc<Schema>> {
        self.schemas
            .read()
            .get(&(interface.to_owned(), procedure.to_owned()))
            .cloned()
    }

    /// Fetch the cached schema or derive it, exactly once per key.
    pub fn get_or_derive(&self, interface: &str, procedure: &ProcedureDescriptor) -> Arc<Schema> {
        if let Some(schema) = self.get(interface, procedure.name()) {
            return schema;
        }
        let mut schemas = self.schemas.write();
        schemas
            .entry((interface.to_owned(), procedure.name().to_owned()))
            .or_insert_with(|| {
                self.derivations.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(interface, procedure = procedure.name(), "derived schema");
                Arc::new(Schema::derive(interface, procedure))
            })
            .clone()
    }

    /// Number of schemas built so far.
    pub fn derivations(&self) -> usize {
        self.derivations.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.schemas.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
