use crate::{procedure::CallingConvention, types::TypeMismatch};
use std::io;
use thiserror::Error;

/// Raised while installing handlers; never occurs at request time.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("unable to build: procedure `{interface}.{procedure}()` is not implemented")]
    NotImplemented { interface: String, procedure: String },

    #[error(
        "unable to build: procedure `{interface}.{procedure}()` is implemented as `{implemented}` \
         while the interface declares it as `{declared}`"
    )]
    CallingConventionMismatch {
        interface: String,
        procedure: String,
        declared: CallingConvention,
        implemented: CallingConvention,
    },

    #[error("route `{0}` is already registered")]
    DuplicateRoute(String),
}

/// Failure to serve a single request.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed request envelope: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("missing argument `{param}` for procedure `{interface}.{procedure}()`")]
    MissingArgument {
        interface: String,
        procedure: String,
        param: String,
    },

    #[error("invalid argument `{param}` for procedure `{interface}.{procedure}()`: {source}")]
    Validation {
        interface: String,
        procedure: String,
        param: String,
        #[source]
        source: TypeMismatch,
    },

    #[error("procedure `{interface}.{procedure}()` takes {expected} positional arguments but {given} were given")]
    TooManyArguments {
        interface: String,
        procedure: String,
        expected: usize,
        given: usize,
    },

    /// Validated arguments that still do not fit the body's own argument type,
    /// such as `300` for a `u8`.
    #[error("invalid arguments for procedure `{procedure}`: {source}")]
    Binding {
        procedure: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("procedure `{procedure}` failed: {source}")]
    Procedure {
        procedure: String,
        #[source]
        source: ProcedureError,
    },

    #[error("encoding result: {0}")]
    Encode(#[source] serde_json::Error),
}

impl DispatchError {
    /// The status code a transport should answer with.
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::Decode(_) => 400,
            DispatchError::MissingArgument { .. }
            | DispatchError::Validation { .. }
            | DispatchError::TooManyArguments { .. }
            | DispatchError::Binding { .. } => 422,
            DispatchError::Procedure { .. } | DispatchError::Encode(_) => 500,
        }
    }
}

/// Error returned by a procedure body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProcedureError {
    message: String,
}

impl ProcedureError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for ProcedureError {
    fn from(err: serde_json::Error) -> Self {
        ProcedureError::new(err.to_string())
    }
}

/// Client-observed failure of a remote call.
#[derive(Debug, Error)]
pub enum CallError {
    /// The server kept answering with a non-success status until retries ran out.
    #[error("rpc call failed method={procedure} status={status}")]
    CallFailure {
        procedure: String,
        status: u16,
        detail: Option<String>,
    },

    /// The transport kept failing until retries ran out.
    #[error("rpc call failed method={procedure}: {source}")]
    Rpc {
        procedure: String,
        #[source]
        source: TransportError,
    },

    #[error("interface `{interface}` has no procedure `{procedure}`")]
    UnknownProcedure { interface: String, procedure: String },

    #[error("encoding request for method={procedure}: {source}")]
    Encode {
        procedure: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("decoding result of method={procedure}: {source}")]
    Decode {
        procedure: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure below the envelope layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("timed out")]
    Timeout,

    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("connection closed without a response")]
    Closed,

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("timeout must be a finite, non-negative number of seconds, got {0}")]
    InvalidTimeout(f64),

    #[error("no port configured")]
    MissingPort,

    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("resolving {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
}
