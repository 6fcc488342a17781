//! Protobuf socket-rpc wire protocol.
//!
//! This crate holds the pieces of the socket-rpc protocol that are pure data:
//! the request/response envelopes that wrap every serialized payload, the
//! [`ErrorReason`] table shared by client and server, and the size-prefixed
//! frame codec used on stream transports. It performs no I/O.
//!
//! # Example
//!
//! ```
//! use protocol_socketrpc::{ErrorReason, Request, Response, frame};
//!
//! // Wrap an already-serialized payload and frame it for the wire.
//! let request = Request::new("WidgetService", "find", b"\x08\x01".to_vec());
//! let mut out = Vec::new();
//! frame::encode(&request.to_bytes(), &mut out);
//!
//! // A server that fails the call only sets the error fields.
//! let response = Response::failure(ErrorReason::MethodNotFound, "no such method");
//! let decoded = Response::from_bytes(&response.to_bytes()).unwrap();
//! assert_eq!(decoded.reason_code(), Some(ErrorReason::MethodNotFound as i32));
//! assert!(decoded.payload().is_none());
//! ```

mod envelope;
mod error;
pub mod frame;
mod reason;

pub use envelope::{Request, Response};
pub use error::{DecodeError, FrameError};
pub use reason::{ErrorReason, UnknownReason};
