//! # Codec
//!
//! Byte codecs for sort keys and values.
//!
//! A [`Codec`] turns a typed value into a byte sequence and back. The combiner
//! uses two independent codecs: one for the **sort key** and one for the
//! **value**. Values only need to round-trip. Sort keys additionally need to
//! be *order-preserving*: for any `a <= b`, `encode(a) <= encode(b)` under
//! unsigned lexicographic byte comparison. The combiner never checks this; it
//! is a precondition of the caller.
//!
//! ## Built-in codecs
//! - [`U32Codec`], [`U64Codec`]: fixed-width big-endian.
//! - [`I32Codec`], [`I64Codec`]: big-endian with the sign bit flipped.
//! - [`F64Codec`]: IEEE-754 total-order transform.
//! - [`BytesCodec`], [`StringCodec`]: identity on the raw bytes.
//!
//! ## Example
//! ```rust
//! use codec::{Codec, I64Codec};
//!
//! let c = I64Codec;
//! let neg = c.encode_to_vec(&-5).unwrap();
//! let pos = c.encode_to_vec(&7).unwrap();
//! assert!(neg < pos);
//! assert_eq!(c.decode(&pos).unwrap(), 7);
//! ```

mod primitives;

pub use primitives::{
    BytesCodec, F64Codec, I32Codec, I64Codec, StringCodec, U32Codec, U64Codec,
};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("invalid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("{0}")]
    Custom(String),
}

/// Serializes values of type `T` to bytes and back.
///
/// Implementations must round-trip exactly: `decode(encode(x)) == x`.
pub trait Codec<T> {
    /// Appends the encoding of `value` to `out`.
    ///
    /// On error `out` may contain a partial encoding; callers discard it.
    fn encode(&self, value: &T, out: &mut Vec<u8>) -> Result<(), CodecError>;

    /// Decodes a value from exactly `bytes`.
    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError>;

    /// Encodes `value` into a fresh buffer.
    fn encode_to_vec(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        self.encode(value, &mut out)?;
        Ok(out)
    }
}

impl<T, C: Codec<T> + ?Sized> Codec<T> for &C {
    fn encode(&self, value: &T, out: &mut Vec<u8>) -> Result<(), CodecError> {
        (**self).encode(value, out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        (**self).decode(bytes)
    }
}

impl<T, C: Codec<T> + ?Sized> Codec<T> for std::sync::Arc<C> {
    fn encode(&self, value: &T, out: &mut Vec<u8>) -> Result<(), CodecError> {
        (**self).encode(value, out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        (**self).decode(bytes)
    }
}
