//! Textual representation of cache entries.
//!
//! Entries are stored as compact JSON. Object fields keep their insertion
//! order and arrays keep their element order, so `decode(encode(v)) == v` for
//! every JSON-representable value.

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode cache entry: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode cache entry: {0}")]
    Decode(#[source] serde_json::Error),
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(CodecError::Encode)
}

pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    serde_json::from_str(text).map_err(CodecError::Decode)
}
