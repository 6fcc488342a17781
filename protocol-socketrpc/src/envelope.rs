//! Request and response envelopes.
//!
//! Every call is one `Request` followed by one `Response`. The envelopes carry
//! the caller's payload as opaque bytes; the payload's own protobuf type is
//! only known to the two endpoints.

use bytes::Bytes;
use prost::Message;

use crate::error::DecodeError;
use crate::reason::ErrorReason;

/// Outbound envelope: routing plus the serialized request payload.
#[derive(Clone, PartialEq, Message)]
pub struct Request {
    #[prost(string, tag = "1")]
    pub service_name: String,
    #[prost(string, tag = "2")]
    pub method_name: String,
    #[prost(bytes = "bytes", tag = "3")]
    pub request_proto: Bytes,
}

impl Request {
    pub fn new(
        service_name: impl Into<String>,
        method_name: impl Into<String>,
        request_proto: impl Into<Bytes>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            method_name: method_name.into(),
            request_proto: request_proto.into(),
        }
    }

    /// Serialize the envelope.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// Parse an envelope from its serialized form.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self::decode(buf)?)
    }
}

/// Inbound envelope.
///
/// A response is an error response iff `error_reason` is present. The payload
/// is only meaningful when it is not.
#[derive(Clone, PartialEq, Message)]
pub struct Response {
    #[prost(bytes = "bytes", optional, tag = "1")]
    pub response_proto: Option<Bytes>,
    #[prost(string, optional, tag = "2")]
    pub error: Option<String>,
    #[prost(bool, optional, tag = "3")]
    pub callback: Option<bool>,
    #[prost(enumeration = "ErrorReason", optional, tag = "4")]
    pub error_reason: Option<i32>,
}

impl Response {
    /// A successful response carrying `payload`.
    pub fn success(payload: impl Into<Bytes>) -> Self {
        Self {
            response_proto: Some(payload.into()),
            ..Default::default()
        }
    }

    /// An error response with a known reason.
    pub fn failure(reason: ErrorReason, text: impl Into<String>) -> Self {
        Self::failure_code(reason.ordinal(), text)
    }

    /// An error response with a raw reason ordinal, which need not be one
    /// this build knows about.
    pub fn failure_code(code: i32, text: impl Into<String>) -> Self {
        Self {
            error: Some(text.into()),
            error_reason: Some(code),
            ..Default::default()
        }
    }

    /// The raw error reason ordinal, if this is an error response.
    #[inline]
    pub fn reason_code(&self) -> Option<i32> {
        self.error_reason
    }

    /// The server's error text, or `""` if none was sent.
    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }

    /// The serialized response payload, if present.
    pub fn payload(&self) -> Option<&Bytes> {
        self.response_proto.as_ref()
    }

    /// Serialize the envelope.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// Parse an envelope from its serialized form.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self::decode(buf)?)
    }
}
