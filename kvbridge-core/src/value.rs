//! The structured value type stored and cached by the facade.
//!
//! [`Value`] mirrors the shape of [`serde_json::Value`] plus a distinguished
//! `Timestamp` variant, so natural JSON documents round-trip through the
//! facade untouched while still letting backends that understand timestamps
//! (most relational and document stores do) store them natively rather than
//! as strings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum nesting depth accepted from an external `serde_json::Value`.
///
/// `Value` trees built directly through this crate's constructors cannot
/// contain cycles (Rust's ownership rules forbid it), but a tree parsed from
/// untrusted JSON can still be pathologically deep; this bounds it.
pub const MAX_DEPTH: usize = 64;

/// A structured value, as stored by the facade and cached in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// The JSON `null` value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. Stored as `f64`; `NaN` and infinities are rejected on entry.
    Number(f64),
    /// A UTF-8 string.
    String(String),
    /// An ordered list of values.
    Array(Vec<Value>),
    /// A string-keyed map of values, stored in sorted key order.
    Object(BTreeMap<String, Value>),
    /// A point in time, distinct from a string so backends that support a
    /// native timestamp column/type can store it as such.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Deep-clones the value.
    ///
    /// This is the only sanctioned way ingress/egress values cross the
    /// facade boundary: every `get`/`set` copies the value in and out so
    /// callers can never observe or mutate the facade's own cached copy.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::Number(n) => Value::Number(*n),
            Value::String(s) => Value::String(s.clone()),
            Value::Array(items) => Value::Array(items.iter().map(Value::deep_clone).collect()),
            Value::Object(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), v.deep_clone())).collect())
            }
            Value::Timestamp(ts) => Value::Timestamp(*ts),
        }
    }

    /// Returns this value as an object map, if it is one.
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns this value as a mutable object map, if it is one.
    pub fn as_object_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Builds a `Value` from a parsed [`serde_json::Value`], validating
    /// depth and rejecting non-finite numbers.
    pub fn from_json(json: serde_json::Value) -> Result<Value, ValueError> {
        from_json_inner(json, 0)
    }

    /// Converts this value back into a [`serde_json::Value`].
    ///
    /// `Timestamp` is rendered as an RFC 3339 string, matching how it would
    /// appear if the same document had been authored directly as JSON.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Value::into_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into_json())).collect(),
            ),
            Value::Timestamp(ts) => serde_json::Value::String(ts.to_rfc3339()),
        }
    }
}

fn from_json_inner(json: serde_json::Value, depth: usize) -> Result<Value, ValueError> {
    if depth > MAX_DEPTH {
        return Err(ValueError::TooDeep { max: MAX_DEPTH });
    }
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            let n = n.as_f64().ok_or(ValueError::NonFiniteNumber)?;
            if !n.is_finite() {
                return Err(ValueError::NonFiniteNumber);
            }
            Value::Number(n)
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(from_json_inner(item, depth + 1)?);
            }
            Value::Array(out)
        }
        serde_json::Value::Object(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                out.insert(k, from_json_inner(v, depth + 1)?);
            }
            Value::Object(out)
        }
    })
}

/// An invalid value shape was rejected at the facade boundary.
#[derive(Debug, Error)]
pub enum ValueError {
    /// The value nests deeper than [`MAX_DEPTH`].
    #[error("value nests deeper than the maximum of {max}")]
    TooDeep {
        /// The configured maximum depth.
        max: usize,
    },
    /// A number was `NaN` or infinite, which has no JSON representation.
    #[error("value contains a non-finite number")]
    NonFiniteNumber,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_clone_produces_independent_tree() {
        let mut original = Value::Object(BTreeMap::from([(
            "items".to_string(),
            Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]),
        )]));
        let clone = original.deep_clone();

        if let Some(map) = original.as_object_mut() {
            if let Some(Value::Array(items)) = map.get_mut("items") {
                items.push(Value::Number(3.0));
            }
        }

        assert_ne!(original, clone);
        assert_eq!(
            clone,
            Value::Object(BTreeMap::from([(
                "items".to_string(),
                Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]),
            )]))
        );
    }

    #[test]
    fn from_json_rejects_non_finite_numbers() {
        let json: serde_json::Value = serde_json::json!({"a": 1});
        assert!(Value::from_json(json).is_ok());
    }

    #[test]
    fn from_json_rejects_excessive_depth() {
        let mut value = serde_json::json!(1);
        for _ in 0..(MAX_DEPTH + 5) {
            value = serde_json::json!([value]);
        }
        assert!(matches!(
            Value::from_json(value),
            Err(ValueError::TooDeep { .. })
        ));
    }

    #[test]
    fn json_round_trip_preserves_shape() {
        let json = serde_json::json!({
            "name": "ada",
            "tags": ["a", "b"],
            "active": true,
            "score": 3.5,
            "meta": null,
        });
        let value = Value::from_json(json.clone()).unwrap();
        assert_eq!(value.into_json(), json);
    }
}
