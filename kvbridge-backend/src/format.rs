//! Wire formats used to cross the backend boundary.
//!
//! The in-process cache always holds a structured [`Value`]; only values
//! that actually cross into a backend get encoded. Which format is used is
//! a config choice (`json` in the facade's CBL options), not a per-backend
//! compile-time decision, so `Format` stays dyn-compatible exactly like the
//! rest of the backend contract.

use std::fmt;

use kvbridge_core::Value;
use thiserror::Error;

use crate::Raw;

/// Encodes/decodes a [`Value`] to and from the bytes a backend stores.
pub trait Format: fmt::Debug + Send + Sync {
    /// Serializes a value to raw bytes.
    fn encode(&self, value: &Value) -> Result<Raw, FormatError>;

    /// Deserializes raw bytes back into a value.
    fn decode(&self, data: &[u8]) -> Result<Value, FormatError>;
}

/// Human-readable format. Slower and larger on the wire, but values are
/// directly inspectable in the backend (e.g. with `redis-cli`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn encode(&self, value: &Value) -> Result<Raw, FormatError> {
        let json = value.clone().into_json();
        serde_json::to_vec(&json)
            .map(Raw::from)
            .map_err(|e| FormatError::Encode(Box::new(e)))
    }

    fn decode(&self, data: &[u8]) -> Result<Value, FormatError> {
        let json: serde_json::Value =
            serde_json::from_slice(data).map_err(|e| FormatError::Decode(Box::new(e)))?;
        Value::from_json(json).map_err(|e| FormatError::Decode(Box::new(e)))
    }
}

/// Compact binary format. The default for backends that don't need
/// human-readable storage (the in-memory and embedded drivers use this).
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeFormat;

impl Format for BincodeFormat {
    fn encode(&self, value: &Value) -> Result<Raw, FormatError> {
        let json = value.clone().into_json();
        bincode::serde::encode_to_vec(&json, bincode::config::standard())
            .map(Raw::from)
            .map_err(|e| FormatError::Encode(Box::new(e)))
    }

    fn decode(&self, data: &[u8]) -> Result<Value, FormatError> {
        let (json, _): (serde_json::Value, usize) =
            bincode::serde::decode_from_slice(data, bincode::config::standard())
                .map_err(|e| FormatError::Decode(Box::new(e)))?;
        Value::from_json(json).map_err(|e| FormatError::Decode(Box::new(e)))
    }
}

/// An error encoding or decoding a value for the backend boundary.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Encoding the value failed.
    #[error("failed to encode value: {0}")]
    Encode(Box<dyn std::error::Error + Send + Sync>),
    /// Decoding the stored bytes failed.
    #[error("failed to decode value: {0}")]
    Decode(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn json_format_round_trips() {
        let value = Value::Object(BTreeMap::from([(
            "n".to_string(),
            Value::Number(42.0),
        )]));
        let encoded = JsonFormat.encode(&value).unwrap();
        assert_eq!(JsonFormat.decode(&encoded).unwrap(), value);
    }

    #[test]
    fn bincode_format_round_trips() {
        let value = Value::Array(vec![Value::String("a".into()), Value::Bool(true)]);
        let encoded = BincodeFormat.encode(&value).unwrap();
        assert_eq!(BincodeFormat.decode(&encoded).unwrap(), value);
    }
}
