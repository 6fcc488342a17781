use std::fmt;
use std::str::FromStr;

/// Why a socket-rpc call failed.
///
/// The discriminants are the ordinals carried in the `error_reason` field of
/// the response envelope and must never be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ErrorReason {
    BadRequestData = 0,
    BadRequestProto = 1,
    ServiceNotFound = 2,
    MethodNotFound = 3,
    RpcError = 4,
    RpcFailed = 5,
    InvalidRequestProto = 6,
    BadResponseProto = 7,
    UnknownHost = 8,
    IoError = 9,
}

impl ErrorReason {
    /// Every reason, in ordinal order.
    pub const ALL: [ErrorReason; 10] = [
        Self::BadRequestData,
        Self::BadRequestProto,
        Self::ServiceNotFound,
        Self::MethodNotFound,
        Self::RpcError,
        Self::RpcFailed,
        Self::InvalidRequestProto,
        Self::BadResponseProto,
        Self::UnknownHost,
        Self::IoError,
    ];

    /// Look up a reason by its wire ordinal. Returns `None` for ordinals this
    /// build does not know about.
    pub fn from_ordinal(v: i32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// The wire ordinal.
    #[inline]
    pub fn ordinal(self) -> i32 {
        self as i32
    }

    /// The symbolic name, e.g. `RPC_ERROR`.
    pub fn name(self) -> &'static str {
        match self {
            Self::BadRequestData => "BAD_REQUEST_DATA",
            Self::BadRequestProto => "BAD_REQUEST_PROTO",
            Self::ServiceNotFound => "SERVICE_NOT_FOUND",
            Self::MethodNotFound => "METHOD_NOT_FOUND",
            Self::RpcError => "RPC_ERROR",
            Self::RpcFailed => "RPC_FAILED",
            Self::InvalidRequestProto => "INVALID_REQUEST_PROTO",
            Self::BadResponseProto => "BAD_RESPONSE_PROTO",
            Self::UnknownHost => "UNKNOWN_HOST",
            Self::IoError => "IO_ERROR",
        }
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A symbolic reason name that is not in the table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error reason: {0}")]
pub struct UnknownReason(pub String);

impl FromStr for ErrorReason {
    type Err = UnknownReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| UnknownReason(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_stable() {
        for (i, reason) in ErrorReason::ALL.into_iter().enumerate() {
            assert_eq!(reason.ordinal(), i as i32);
            assert_eq!(ErrorReason::from_ordinal(i as i32), Some(reason));
        }
        assert_eq!(ErrorReason::RpcError.ordinal(), 4);
        assert_eq!(ErrorReason::InvalidRequestProto.ordinal(), 6);
        assert_eq!(ErrorReason::BadResponseProto.ordinal(), 7);
    }

    #[test]
    fn unknown_ordinal() {
        assert_eq!(ErrorReason::from_ordinal(10), None);
        assert_eq!(ErrorReason::from_ordinal(-1), None);
        assert_eq!(ErrorReason::from_ordinal(99), None);
    }

    #[test]
    fn symbolic_names() {
        assert_eq!("RPC_ERROR".parse::<ErrorReason>(), Ok(ErrorReason::RpcError));
        assert_eq!(
            "BAD_RESPONSE_PROTO".parse::<ErrorReason>(),
            Ok(ErrorReason::BadResponseProto)
        );
        assert_eq!(
            "rpc_error".parse::<ErrorReason>(),
            Err(UnknownReason("rpc_error".into()))
        );
    }

    #[test]
    fn reason_display() {
        assert_eq!(ErrorReason::MethodNotFound.to_string(), "METHOD_NOT_FOUND");
        assert_eq!(ErrorReason::IoError.to_string(), "IO_ERROR");
    }
}
