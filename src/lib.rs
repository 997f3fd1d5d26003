//! Contract-driven RPC over a request/response transport.
//!
//! An [`Interface`] declares which procedures are remote and what their
//! parameters look like. From that declaration the crate builds
//!
//! - client stubs ([`ClientBuilder`], [`RemoteInterface`]) that send
//!   `{"args": [...], "kwargs": {...}}` to `POST {prefix}/{Interface}/{procedure}`
//!   and retry on failure, and
//! - server handlers ([`ServerBuilder`]) that validate requests against a
//!   [`Schema`] derived from the declaration and invoke an [`Implementation`],
//!   answering `{"data": ...}`.
//!
//! ```
//! use contractrpc::{
//!     interface, Bindings, Call, ClientBuilder, Implementation, Kwargs, Loopback,
//!     RouteTable, RpcConfig, SchemaRegistry, ServerBuilder,
//! };
//! use std::sync::Arc;
//!
//! interface! {
//!     pub struct Calculator {
//!         fn add(a: i64, b: i64) -> i64;
//!     }
//! }
//!
//! struct Adder;
//!
//! impl Implementation for Adder {
//!     type Interface = Calculator;
//!
//!     fn bind(bindings: &mut Bindings<Self>) {
//!         bindings.sync("add", |_: &Self, args: Kwargs| {
//!             Ok(args["a"].as_i64().unwrap_or(0) + args["b"].as_i64().unwrap_or(0))
//!         });
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = RpcConfig::default();
//! let mut routes = RouteTable::new();
//! ServerBuilder::new(&config, Arc::new(SchemaRegistry::new()))
//!     .setup(Arc::new(Adder), &mut routes, "/rpc")
//!     .unwrap();
//!
//! let calculator = ClientBuilder::new(&config, Loopback::new(Arc::new(routes)))
//!     .unwrap()
//!     .build::<Calculator>("/rpc");
//! let sum: i64 = calculator.call("add", Call::new().arg(2).arg(3)).await.unwrap();
//! assert_eq!(sum, 5);
//! # }
//! ```

pub mod client;
pub mod config;
pub mod conformance;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod implementation;
mod macros;
pub mod net;
pub mod procedure;
pub mod schema;
pub mod server;
pub mod transport;
pub mod types;

pub use client::{Call, ClientBuilder, RemoteInterface, Stub};
pub use config::RpcConfig;
pub use dispatcher::Dispatcher;
pub use envelope::{RequestEnvelope, ResponseEnvelope};
pub use error::{CallError, ConfigError, DispatchError, ProcedureError, SetupError, TransportError};
pub use futures::future::BoxFuture;
pub use implementation::{Bindings, Body, Implementation};
pub use procedure::{
    list_procedures, CallingConvention, Interface, InterfaceDescriptor, Param, ProcedureDescriptor,
};
pub use schema::{Schema, SchemaRegistry};
pub use server::ServerBuilder;
pub use transport::{Handler, Loopback, Reply, RouteTable, Router, Transport};
pub use types::{Kwargs, Type, TypeMismatch, Typed, Value};
