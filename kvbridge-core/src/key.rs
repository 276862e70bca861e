//! The opaque key type shared by every layer of the facade.

use std::fmt;
use std::sync::Arc;

/// Default cap on key length in bytes, enforced at the facade boundary
/// unless a backend declares a tighter maximum of its own.
pub const DEFAULT_MAX_KEY_LEN: usize = 100;

/// A cache/storage key.
///
/// Cloning is cheap: the key string lives behind an `Arc` so fan-out across
/// the per-key serializer's guard table, the pending-read table, and the
/// write buffer never duplicates the underlying bytes.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Key(Arc<str>);

impl Key {
    /// Builds a key from any string-like value, without validating length.
    ///
    /// Length validation happens once, at the facade boundary, via
    /// [`Key::validate_len`] — constructing a `Key` itself never fails.
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Key(value.into())
    }

    /// Returns the key as a plain string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the length of the key in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the key is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks the key's length against `max_len`, returning an error if it's
    /// too long.
    pub fn validate_len(&self, max_len: usize) -> Result<(), KeyTooLong> {
        if self.len() > max_len {
            Err(KeyTooLong {
                len: self.len(),
                max_len,
            })
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key(Arc::from(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key(Arc::from(value))
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The key exceeds the backend's maximum length.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("key is {len} bytes, exceeding the maximum of {max_len}")]
pub struct KeyTooLong {
    /// Observed key length in bytes.
    pub len: usize,
    /// Maximum allowed length in bytes.
    pub max_len: usize,
}

/// Tests whether `key` matches a `findKeys`-style glob pattern.
///
/// Only `*` is special, matching any run of zero or more characters
/// (including none); every other character, including `?`, is literal.
/// This mirrors the glob semantics backends translate to SQL `LIKE` with `%`.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    fn inner(pattern: &[u8], key: &[u8]) -> bool {
        match pattern.split_first() {
            None => key.is_empty(),
            Some((b'*', rest)) => {
                if rest.is_empty() {
                    return true;
                }
                for i in 0..=key.len() {
                    if inner(rest, &key[i..]) {
                        return true;
                    }
                }
                false
            }
            Some((c, rest)) => match key.split_first() {
                Some((k, krest)) if k == c => inner(rest, krest),
                _ => false,
            },
        }
    }
    inner(pattern.as_bytes(), key.as_bytes())
}
