//! JSON encoding and decoding for API bodies.
//!
//! Thin wrappers over `serde_json` that fold failures into a single
//! [`CodecError`], so callers do not depend on `serde_json` error types.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Error type for codec encode/decode operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("encode error: {0}")]
    Encode(String),
    /// The bytes were not valid JSON for the expected type.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Encodes a body as JSON bytes.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if the value cannot be serialized.
pub fn encode<T: Serialize>(body: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(body).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decodes a body from JSON bytes.
///
/// An empty slice decodes as JSON `null`, which lets unit-like and
/// `Option` responses accept an empty 2xx body.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the bytes do not match `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let bytes = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        bytes
    };
    serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}
