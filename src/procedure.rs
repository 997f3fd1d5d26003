use crate::types::{Type, Value};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};

/// Whether a procedure returns immediately or suspends until completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum CallingConvention {
    Sync,
    Async,
}

impl fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            CallingConvention::Sync => "fn",
            CallingConvention::Async => "async fn",
        })
    }
}

/// One formal parameter of a procedure. The receiver is never described.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub default: Option<Value>,
}

impl Param {
    pub fn required(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: Type, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            ty,
            default: Some(default.into()),
        }
    }

    /// An unannotated parameter.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self::required(name, Type::Any)
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Declaration of a remote procedure on an interface.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProcedureDescriptor {
    name: String,
    params: Vec<Param>,
    convention: CallingConvention,
}

impl ProcedureDescriptor {
    pub fn new(name: impl Into<String>, convention: CallingConvention) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            convention,
        }
    }

    pub fn sync(name: impl Into<String>) -> Self {
        Self::new(name, CallingConvention::Sync)
    }

    pub fn asynchronous(name: impl Into<String>) -> Self {
        Self::new(name, CallingConvention::Async)
    }

    /// Append a parameter; declaration order is call order.
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn convention(&self) -> CallingConvention {
        self.convention
    }
}

/// The set of procedures an interface marks as remote.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InterfaceDescriptor {
    name: String,
    procedures: Vec<ProcedureDescriptor>,
}

impl InterfaceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            procedures: Vec::new(),
        }
    }

    /// Mark a procedure as remote. Procedures are declared once: a second
    /// declaration under the same name is ignored.
    pub fn register(mut self, procedure: ProcedureDescriptor) -> Self {
        if self.procedure(procedure.name()).is_some() {
            tracing::warn!(
                interface = %self.name,
                procedure = procedure.name(),
                "procedure declared twice, keeping the first declaration"
            );
            return self;
        }
        self.procedures.push(procedure);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn procedures(&self) -> &[ProcedureDescriptor] {
        &self.procedures
    }

    /// `None` for names that are not marked remote.
    pub fn procedure(&self, name: &str) -> Option<&ProcedureDescriptor> {
        self.procedures.iter().find(|p| p.name == name)
    }

    pub fn procedure_names(&self) -> BTreeSet<String> {
        self.procedures.iter().map(|p| p.name.clone()).collect()
    }
}

/// An abstract interface whose procedures can be served and called remotely.
///
/// ```
/// use contractrpc::{procedure, Interface, ProcedureDescriptor};
///
/// struct Calculator;
///
/// impl Interface for Calculator {
///     const NAME: &'static str = "Calculator";
///
///     fn procedures() -> Vec<ProcedureDescriptor> {
///         vec![procedure!(fn add(a: i64, b: i64 = 0))]
///     }
/// }
///
/// assert!(contractrpc::list_procedures::<Calculator>().contains("add"));
/// ```
pub trait Interface {
    const NAME: &'static str;

    fn procedures() -> Vec<ProcedureDescriptor>;

    fn descriptor() -> InterfaceDescriptor {
        Self::procedures()
            .into_iter()
            .fold(InterfaceDescriptor::new(Self::NAME), InterfaceDescriptor::register)
    }
}

pub fn list_procedures<I: Interface>() -> BTreeSet<String> {
    I::descriptor().procedure_names()
}
