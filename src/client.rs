use crate::{
    config::RpcConfig,
    envelope::{self, RequestEnvelope, ResponseEnvelope},
    error::{CallError, ConfigError, TransportError},
    procedure::Interface,
    transport::{self, Reply, Transport},
    types::{Kwargs, Value},
};
use serde::de::DeserializeOwned;
use std::{collections::BTreeMap, sync::Arc, time::Duration};

/// Arguments of one remote call, plus optional per-call overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Call {
    args: Vec<Value>,
    kwargs: Kwargs,
    timeout: Option<Duration>,
    retry: Option<u32>,
}

impl Call {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn envelope(&self) -> RequestEnvelope {
        RequestEnvelope {
            args: self.args.clone(),
            kwargs: self.kwargs.clone(),
        }
    }
}

/// The generated caller of one remote procedure.
#[derive(Clone)]
pub struct Stub {
    procedure: String,
    path: String,
    timeout: Duration,
    retry: u32,
    double_encoded: bool,
    transport: Arc<dyn Transport>,
}

enum Failure {
    Status(Reply),
    Transport(TransportError),
}

impl Stub {
    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry(&self) -> u32 {
        self.retry
    }

    /// Send the call, reissuing it immediately after each failure until the
    /// retry budget is spent. A rejected request (4xx) is not reissued.
    /// Returns the `data` field of the response.
    pub async fn call(&self, call: Call) -> Result<Value, CallError> {
        let body = envelope::encode(&call.envelope(), self.double_encoded).map_err(|source| {
            CallError::Encode {
                procedure: self.procedure.clone(),
                source,
            }
        })?;
        let timeout = call.timeout.unwrap_or(self.timeout);
        let mut retry = call.retry.unwrap_or(self.retry);

        loop {
            let failure = match self.transport.post(&self.path, body.clone(), timeout).await {
                Ok(reply) if reply.is_success() => {
                    match envelope::decode::<ResponseEnvelope>(&reply.body) {
                        Ok(response) => return Ok(response.data),
                        Err(err) => Failure::Transport(TransportError::Malformed(err.to_string())),
                    }
                }
                Ok(reply) if reply.is_client_error() => {
                    return Err(self.exhausted(Failure::Status(reply)));
                }
                Ok(reply) => Failure::Status(reply),
                Err(err) => Failure::Transport(err),
            };

            if retry == 0 {
                return Err(self.exhausted(failure));
            }
            retry -= 1;
            match &failure {
                Failure::Status(reply) => tracing::warn!(
                    procedure = %self.procedure,
                    status = reply.status,
                    retries_left = retry,
                    "rpc call failed, retrying"
                ),
                Failure::Transport(err) => tracing::warn!(
                    procedure = %self.procedure,
                    retries_left = retry,
                    "rpc call failed, retrying: {err}"
                ),
            }
        }
    }

    fn exhausted(&self, failure: Failure) -> CallError {
        match failure {
            Failure::Status(reply) => CallError::CallFailure {
                procedure: self.procedure.clone(),
                status: reply.status,
                detail: reply.detail_message(),
            },
            Failure::Transport(source) => CallError::Rpc {
                procedure: self.procedure.clone(),
                source,
            },
        }
    }
}

/// Client-side proxy for an interface: one [`Stub`] per remote procedure.
///
/// Wrap it in a typed client to get ordinary method calls:
///
/// ```no_run
/// # use contractrpc::{Call, CallError, RemoteInterface};
/// struct CalculatorClient(RemoteInterface);
///
/// impl CalculatorClient {
///     async fn add(&self, a: i64, b: i64) -> Result<i64, CallError> {
///         self.0.call("add", Call::new().arg(a).arg(b)).await
///     }
/// }
/// ```
#[derive(Clone)]
pub struct RemoteInterface {
    interface: String,
    stubs: BTreeMap<String, Stub>,
}

impl RemoteInterface {
    pub fn name(&self) -> &str {
        &self.interface
    }

    pub fn stub(&self, procedure: &str) -> Option<&Stub> {
        self.stubs.get(procedure)
    }

    pub fn procedure_names(&self) -> impl Iterator<Item = &str> {
        self.stubs.keys().map(String::as_str)
    }

    pub async fn call_value(&self, procedure: &str, call: Call) -> Result<Value, CallError> {
        let stub = self
            .stubs
            .get(procedure)
            .ok_or_else(|| CallError::UnknownProcedure {
                interface: self.interface.clone(),
                procedure: procedure.to_owned(),
            })?;
        stub.call(call).await
    }

    pub async fn call<R: DeserializeOwned>(&self, procedure: &str, call: Call) -> Result<R, CallError> {
        let data = self.call_value(procedure, call).await?;
        serde_json::from_value(data).map_err(|source| CallError::Decode {
            procedure: procedure.to_owned(),
            source,
        })
    }
}

/// Generates [`RemoteInterface`]s for interfaces served behind one transport.
#[derive(Clone)]
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    retry: u32,
    double_encoded: bool,
}

impl ClientBuilder {
    pub fn new(config: &RpcConfig, transport: impl Transport + 'static) -> Result<Self, ConfigError> {
        Ok(Self {
            transport: Arc::new(transport),
            timeout: config.timeout_duration()?,
            retry: config.retry,
            double_encoded: config.legacy_double_encoding,
        })
    }

    /// Override the configured default timeout for stubs built from here on.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the configured default retry count for stubs built from here on.
    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn build<I: Interface>(&self, prefix: &str) -> RemoteInterface {
        let descriptor = I::descriptor();
        let stubs = descriptor
            .procedures()
            .iter()
            .map(|procedure| {
                let stub = Stub {
                    procedure: procedure.name().to_owned(),
                    path: transport::route(prefix, descriptor.name(), procedure.name()),
                    timeout: self.timeout,
                    retry: self.retry,
                    double_encoded: self.double_encoded,
                    transport: self.transport.clone(),
                };
                (procedure.name().to_owned(), stub)
            })
            .collect::<BTreeMap<_, _>>();
        tracing::info!(
            interface = descriptor.name(),
            prefix,
            procedures = stubs.len(),
            "client stubs installed"
        );
        RemoteInterface {
            interface: descriptor.name().to_owned(),
            stubs,
        }
    }
}
