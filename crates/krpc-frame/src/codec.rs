use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// A u64 varint never needs more than ten bytes.
pub const MAX_PREFIX_SIZE: usize = 10;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Number of bytes the length prefix for a payload of `len` bytes occupies.
pub fn encoded_len_prefix(len: usize) -> usize {
    let mut value = len as u64;
    let mut size = 1;
    while value >= 0x80 {
        value >>= 7;
        size += 1;
    }
    size
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────────────┬──────────────────┐
/// │ Length             │ Payload          │
/// │ (varint, 1-10 B)   │ (Length bytes)   │
/// └────────────────────┴──────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(encoded_len_prefix(payload.len()) + payload.len());
    let mut value = payload.len() as u64;
    while value >= 0x80 {
        dst.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    dst.put_u8(value as u8);
    dst.put_slice(payload);
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    let Some((payload_len, prefix_len)) = peek_prefix(src)? else {
        return Ok(None); // Need more data
    };

    if payload_len > max_payload as u64 {
        return Err(FrameError::PayloadTooLarge {
            size: usize::try_from(payload_len).unwrap_or(usize::MAX),
            max: max_payload,
        });
    }
    let payload_len = payload_len as usize;

    if src.len() < prefix_len + payload_len {
        return Ok(None); // Need more data
    }

    src.advance(prefix_len);
    Ok(Some(src.split_to(payload_len).freeze()))
}

fn peek_prefix(src: &[u8]) -> Result<Option<(u64, usize)>> {
    let mut value = 0u64;
    for (i, byte) in src.iter().take(MAX_PREFIX_SIZE).enumerate() {
        let bits = u64::from(byte & 0x7f);
        if i == MAX_PREFIX_SIZE - 1 && *byte > 0x01 {
            return Err(FrameError::InvalidPrefix);
        }
        value |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
    }

    if src.len() >= MAX_PREFIX_SIZE {
        return Err(FrameError::InvalidPrefix);
    }
    Ok(None)
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
