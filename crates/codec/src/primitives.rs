use byteorder::{BigEndian, ByteOrder};

use crate::{Codec, CodecError};

const SIGN_32: u32 = 1 << 31;
const SIGN_64: u64 = 1 << 63;

fn check_len(bytes: &[u8], expected: usize) -> Result<(), CodecError> {
    if bytes.len() != expected {
        return Err(CodecError::Length {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Big-endian `u32`.
#[derive(Debug, Clone, Copy, Default)]
pub struct U32Codec;

impl Codec<u32> for U32Codec {
    fn encode(&self, value: &u32, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, *value);
        out.extend_from_slice(&buf);
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<u32, CodecError> {
        check_len(bytes, 4)?;
        Ok(BigEndian::read_u32(bytes))
    }
}

/// Big-endian `u64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct U64Codec;

impl Codec<u64> for U64Codec {
    fn encode(&self, value: &u64, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let mut buf = [0u8; 8];
        BigEndian::write_u64(&mut buf, *value);
        out.extend_from_slice(&buf);
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<u64, CodecError> {
        check_len(bytes, 8)?;
        Ok(BigEndian::read_u64(bytes))
    }
}

/// Big-endian `i32` with the sign bit flipped, so negatives sort first.
#[derive(Debug, Clone, Copy, Default)]
pub struct I32Codec;

impl Codec<i32> for I32Codec {
    fn encode(&self, value: &i32, out: &mut Vec<u8>) -> Result<(), CodecError> {
        U32Codec.encode(&((*value as u32) ^ SIGN_32), out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<i32, CodecError> {
        Ok((U32Codec.decode(bytes)? ^ SIGN_32) as i32)
    }
}

/// Big-endian `i64` with the sign bit flipped, so negatives sort first.
#[derive(Debug, Clone, Copy, Default)]
pub struct I64Codec;

impl Codec<i64> for I64Codec {
    fn encode(&self, value: &i64, out: &mut Vec<u8>) -> Result<(), CodecError> {
        U64Codec.encode(&((*value as u64) ^ SIGN_64), out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<i64, CodecError> {
        Ok((U64Codec.decode(bytes)? ^ SIGN_64) as i64)
    }
}

/// `f64` in IEEE-754 total order.
///
/// Negative numbers have every bit inverted; non-negative numbers have only
/// the sign bit set. The result orders `-inf < -0.0 < 0.0 < inf`, with NaNs
/// at both ends according to their sign bit. Bit patterns round-trip exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct F64Codec;

impl Codec<f64> for F64Codec {
    fn encode(&self, value: &f64, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let bits = value.to_bits();
        let ordered = if bits & SIGN_64 != 0 {
            !bits
        } else {
            bits ^ SIGN_64
        };
        U64Codec.encode(&ordered, out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<f64, CodecError> {
        let ordered = U64Codec.decode(bytes)?;
        let bits = if ordered & SIGN_64 != 0 {
            ordered ^ SIGN_64
        } else {
            !ordered
        };
        Ok(f64::from_bits(bits))
    }
}

/// Raw bytes, unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl Codec<Vec<u8>> for BytesCodec {
    fn encode(&self, value: &Vec<u8>, out: &mut Vec<u8>) -> Result<(), CodecError> {
        out.extend_from_slice(value);
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(bytes.to_vec())
    }
}

/// UTF-8 strings. Byte order of UTF-8 matches code point order.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl Codec<String> for StringCodec {
    fn encode(&self, value: &String, out: &mut Vec<u8>) -> Result<(), CodecError> {
        out.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}
