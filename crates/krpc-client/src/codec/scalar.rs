use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::encoding::{decode_varint, encode_varint};

use super::{Decode, DecodeError, Encode, Result};

fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Read a varint that must be the whole payload.
pub(super) fn read_varint(data: &[u8], kind: &'static str) -> Result<u64> {
    let mut buf = data;
    let value = read_varint_prefix(&mut buf, kind)?;
    expect_consumed(buf, kind)?;
    Ok(value)
}

fn read_varint_prefix(buf: &mut &[u8], kind: &'static str) -> Result<u64> {
    if buf.is_empty() {
        return Err(DecodeError::Truncated { kind });
    }
    let terminated = buf.iter().take(10).any(|byte| byte & 0x80 == 0);
    if !terminated && buf.len() < 10 {
        return Err(DecodeError::Truncated { kind });
    }
    decode_varint(buf).map_err(|_| DecodeError::Varint { kind })
}

fn expect_consumed(rest: &[u8], kind: &'static str) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(DecodeError::TrailingBytes {
            kind,
            count: rest.len(),
        })
    }
}

/// Read a varint length prefix followed by exactly that many bytes.
fn read_length_prefixed<'a>(data: &'a [u8], kind: &'static str) -> Result<&'a [u8]> {
    let mut buf = data;
    let len = read_varint_prefix(&mut buf, kind)?;
    let len = usize::try_from(len).map_err(|_| DecodeError::Truncated { kind })?;
    if buf.len() < len {
        return Err(DecodeError::Truncated { kind });
    }
    let (value, rest) = buf.split_at(len);
    expect_consumed(rest, kind)?;
    Ok(value)
}

fn write_length_prefixed(bytes: &[u8], buf: &mut BytesMut) {
    encode_varint(bytes.len() as u64, buf);
    buf.put_slice(bytes);
}

impl Encode for i32 {
    fn encode(&self, buf: &mut BytesMut) {
        encode_varint(zigzag(i64::from(*self)), buf);
    }
}

impl Decode for i32 {
    fn decode(data: &[u8]) -> Result<Self> {
        let value = unzigzag(read_varint(data, "i32")?);
        i32::try_from(value).map_err(|_| DecodeError::OutOfRange {
            kind: "i32",
            value: i128::from(value),
        })
    }
}

impl Encode for i64 {
    fn encode(&self, buf: &mut BytesMut) {
        encode_varint(zigzag(*self), buf);
    }
}

impl Decode for i64 {
    fn decode(data: &[u8]) -> Result<Self> {
        Ok(unzigzag(read_varint(data, "i64")?))
    }
}

impl Encode for u32 {
    fn encode(&self, buf: &mut BytesMut) {
        encode_varint(u64::from(*self), buf);
    }
}

impl Decode for u32 {
    fn decode(data: &[u8]) -> Result<Self> {
        let value = read_varint(data, "u32")?;
        u32::try_from(value).map_err(|_| DecodeError::OutOfRange {
            kind: "u32",
            value: i128::from(value),
        })
    }
}

impl Encode for u64 {
    fn encode(&self, buf: &mut BytesMut) {
        encode_varint(*self, buf);
    }
}

impl Decode for u64 {
    fn decode(data: &[u8]) -> Result<Self> {
        read_varint(data, "u64")
    }
}

impl Encode for bool {
    fn encode(&self, buf: &mut BytesMut) {
        encode_varint(u64::from(*self), buf);
    }
}

impl Decode for bool {
    fn decode(data: &[u8]) -> Result<Self> {
        match read_varint(data, "bool")? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidBool(other)),
        }
    }
}

impl Encode for f32 {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_f32_le(*self);
    }
}

impl Decode for f32 {
    fn decode(data: &[u8]) -> Result<Self> {
        let mut buf = fixed(data, 4, "f32")?;
        Ok(buf.get_f32_le())
    }
}

impl Encode for f64 {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_f64_le(*self);
    }
}

impl Decode for f64 {
    fn decode(data: &[u8]) -> Result<Self> {
        let mut buf = fixed(data, 8, "f64")?;
        Ok(buf.get_f64_le())
    }
}

fn fixed<'a>(data: &'a [u8], width: usize, kind: &'static str) -> Result<&'a [u8]> {
    if data.len() < width {
        return Err(DecodeError::Truncated { kind });
    }
    expect_consumed(&data[width..], kind)?;
    Ok(data)
}

impl Encode for str {
    fn encode(&self, buf: &mut BytesMut) {
        write_length_prefixed(self.as_bytes(), buf);
    }
}

impl Encode for String {
    fn encode(&self, buf: &mut BytesMut) {
        self.as_str().encode(buf);
    }
}

impl Decode for String {
    fn decode(data: &[u8]) -> Result<Self> {
        let raw = read_length_prefixed(data, "string")?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8)
    }
}

impl Encode for Bytes {
    fn encode(&self, buf: &mut BytesMut) {
        write_length_prefixed(self, buf);
    }
}

impl Decode for Bytes {
    fn decode(data: &[u8]) -> Result<Self> {
        read_length_prefixed(data, "bytes").map(Bytes::copy_from_slice)
    }
}
