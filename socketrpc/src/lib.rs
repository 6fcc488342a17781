//! Client side of protobuf socket-rpc.
//!
//! A call names a service and method, carries a typed protobuf request, and
//! ends in either a typed response or a [`ClientError`]. The outcome goes to
//! callbacks registered on the client, or, when none are registered, is
//! returned from the call itself.
//!
//! ```text
//!   Client::dispatch("find", request, setup)
//!        |  method table lookup, setup hook
//!   +----v-----------+
//!   | Invocation     |  validate -> send -> decode -> success | failure -> complete
//!   +----+-----------+
//!        |  request/response envelopes (protocol-socketrpc)
//!   +----v-----------+
//!   | Connector      |  moves bytes (TcpConnector, or your own)
//!   +----------------+
//! ```
//!
//! Guarantees for every call: exactly one of `on_success` / `on_failure`
//! runs, then `on_complete` runs exactly once. A success callback that
//! returns an error turns the call into an `RPC_ERROR` failure; failure and
//! complete callback errors are returned to the caller as [`Error`].

mod callback;
pub mod client;
pub mod connector;
pub mod error;
pub mod invocation;
pub mod message;
pub mod metrics;
pub mod options;
pub mod service;
pub mod stats;

pub use client::Client;
pub use connector::{Connector, TcpConnector, TcpConnectorConfig};
pub use error::{CallbackError, CallbackResult, ClientError, Error, ReasonCode};
pub use invocation::{Invocation, Outcome, Phase};
pub use message::{AnyMessage, FieldMap, FieldsError, MessageType, RequestArg, RpcMessage};
pub use options::ClientOptions;
pub use protocol_socketrpc::ErrorReason;
pub use service::{RpcMethod, ServiceBuilder, ServiceDescriptor};
pub use stats::{Stats, StatsError};
