//! Size-prefixed framing for stream transports.
//!
//! Format: the payload length as ASCII decimal digits, a `-` delimiter, then
//! the payload. `"5-hello"` frames the five bytes `hello`.

use crate::error::FrameError;

/// Separates the decimal size prefix from the payload.
pub const SIZE_DELIMITER: u8 = b'-';

/// Longest size prefix accepted (enough for any `u64`).
pub const MAX_PREFIX_DIGITS: usize = 20;

/// Default limit on a single frame's payload length (64 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Encode one size-prefixed frame.
pub fn encode(payload: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.push(SIZE_DELIMITER);
    out.extend_from_slice(payload);
}

/// Result of attempting to decode a frame from a buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodeResult {
    /// A complete frame was decoded. Contains the payload and bytes consumed.
    Complete { payload: Vec<u8>, consumed: usize },
    /// Not enough data yet.
    Incomplete,
}

/// Try to decode one frame from the front of `buf`.
pub fn decode(buf: &[u8], max_len: usize) -> Result<DecodeResult, FrameError> {
    let mut len: usize = 0;
    let mut digits: usize = 0;

    for &b in buf {
        if b == SIZE_DELIMITER {
            if digits == 0 {
                return Err(FrameError::InvalidPrefix(b));
            }
            let start = digits + 1;
            let total = start.checked_add(len).ok_or(FrameError::PrefixTooLong)?;
            if buf.len() < total {
                return Ok(DecodeResult::Incomplete);
            }
            return Ok(DecodeResult::Complete {
                payload: buf[start..total].to_vec(),
                consumed: total,
            });
        }
        if !b.is_ascii_digit() {
            return Err(FrameError::InvalidPrefix(b));
        }
        digits += 1;
        if digits > MAX_PREFIX_DIGITS {
            return Err(FrameError::PrefixTooLong);
        }
        len = len
            .checked_mul(10)
            .and_then(|l| l.checked_add(usize::from(b - b'0')))
            .ok_or(FrameError::PrefixTooLong)?;
        if len > max_len {
            return Err(FrameError::TooLarge { len, max: max_len });
        }
    }

    Ok(DecodeResult::Incomplete)
}

/// Read buffer that reassembles frames from arbitrary chunks.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    max_len: usize,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl FrameBuffer {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_len,
        }
    }

    /// Append received bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Try to drain one complete frame. Returns `Ok(None)` if incomplete.
    pub fn try_decode(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        match decode(&self.buf, self.max_len)? {
            DecodeResult::Complete { payload, consumed } => {
                self.buf.drain(..consumed);
                Ok(Some(payload))
            }
            DecodeResult::Incomplete => Ok(None),
        }
    }

    /// Number of buffered bytes not yet consumed by a frame.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
