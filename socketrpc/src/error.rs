//! Error types.
//!
//! Two kinds of error live here and must not be confused:
//!
//! * [`ClientError`] is the outcome of a call that failed. It is delivered to
//!   `on_failure` (or returned by the blocking form) and never appears as the
//!   `Err` of a Rust function in this crate.
//! * [`Error`] is what the dispatch and send operations themselves return:
//!   programming errors such as an unknown method, and callback errors that
//!   are re-raised to the caller.

use std::fmt;

use protocol_socketrpc::ErrorReason;

/// Error type returned by caller-supplied callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of caller-supplied callbacks.
pub type CallbackResult = Result<(), CallbackError>;

/// A failure reason as it arrived, known to this build or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonCode {
    /// A reason from the local table.
    Known(ErrorReason),
    /// A raw ordinal with no local name.
    Unknown(i32),
}

impl ReasonCode {
    /// Map a wire ordinal, keeping it raw if it is not in the table.
    pub fn from_ordinal(v: i32) -> Self {
        match ErrorReason::from_ordinal(v) {
            Some(reason) => Self::Known(reason),
            None => Self::Unknown(v),
        }
    }

    /// The wire ordinal.
    pub fn ordinal(self) -> i32 {
        match self {
            Self::Known(reason) => reason.ordinal(),
            Self::Unknown(v) => v,
        }
    }

    /// The symbolic reason, if known.
    pub fn reason(self) -> Option<ErrorReason> {
        match self {
            Self::Known(reason) => Some(reason),
            Self::Unknown(_) => None,
        }
    }
}

impl From<ErrorReason> for ReasonCode {
    fn from(reason: ErrorReason) -> Self {
        Self::Known(reason)
    }
}

impl From<i32> for ReasonCode {
    fn from(v: i32) -> Self {
        Self::from_ordinal(v)
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(reason) => write!(f, "{reason}"),
            Self::Unknown(v) => write!(f, "UNKNOWN({v})"),
        }
    }
}

/// Why a call failed: a reason code plus the human-readable text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ClientError {
    pub code: ReasonCode,
    pub message: String,
}

impl ClientError {
    /// Build an error from a symbolic reason or a raw wire ordinal.
    ///
    /// Never fails: ordinals outside the local table are kept as
    /// [`ReasonCode::Unknown`].
    pub fn new(code: impl Into<ReasonCode>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The symbolic reason, if the code is one this build knows.
    pub fn reason(&self) -> Option<ErrorReason> {
        self.code.reason()
    }
}

/// Errors returned by dispatch and send operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The service has no rpc method with this name.
    #[error("{service}#{method} is not an rpc method")]
    MethodNotFound { service: String, method: String },

    /// The caller's `on_failure` callback returned an error.
    #[error("failure callback error: {0}")]
    FailureCallback(#[source] CallbackError),

    /// The caller's `on_complete` callback returned an error.
    #[error("complete callback error: {0}")]
    CompleteCallback(#[source] CallbackError),

    /// The invocation already ran to completion and cannot be sent again.
    #[error("invocation already completed")]
    AlreadyCompleted,

    /// The call has started; its configuration can no longer change.
    #[error("invocation already started")]
    AlreadyStarted,

    /// A blocking call finished without capturing an outcome.
    #[error("call finished without an outcome")]
    NoOutcome,
}
