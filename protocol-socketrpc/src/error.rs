//! Error types for envelope decoding and framing.

/// An envelope could not be decoded from its protobuf encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("envelope decode error: {0}")]
pub struct DecodeError(#[from] prost::DecodeError);

/// Error type for size-prefixed frame decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The size prefix contained something other than ASCII digits.
    #[error("invalid size prefix byte: {0:#04x}")]
    InvalidPrefix(u8),

    /// The size prefix was longer than any supported length.
    #[error("size prefix too long")]
    PrefixTooLong,

    /// The announced frame length exceeds the configured limit.
    #[error("frame length {len} exceeds limit {max}")]
    TooLarge { len: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_error_display() {
        assert_eq!(
            FrameError::InvalidPrefix(b'x').to_string(),
            "invalid size prefix byte: 0x78"
        );
        assert_eq!(FrameError::PrefixTooLong.to_string(), "size prefix too long");
        assert_eq!(
            FrameError::TooLarge { len: 10, max: 4 }.to_string(),
            "frame length 10 exceeds limit 4"
        );
    }

    #[test]
    fn decode_error_wraps_prost() {
        let err = <crate::Request as prost::Message>::decode(&[0xff][..]).unwrap_err();
        let err = DecodeError::from(err);
        assert!(err.to_string().starts_with("envelope decode error:"));
    }
}
