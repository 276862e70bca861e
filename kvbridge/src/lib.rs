//! A uniform key/value persistence façade over heterogeneous storage
//! backends (relational, document, embedded, in-memory), augmented by an
//! in-process cache-and-buffer layer that serves hot reads from memory,
//! coalesces writes to the same key into at most one backend write per
//! flush, and preserves per-key ordering across all in-flight operations.
//!
//! # Layout
//!
//! - [`Kvbridge`] is the public entry point: construct one over any
//!   [`kvbridge_backend::Backend`] implementation, call [`Kvbridge::init`],
//!   then use `get`/`set`/`remove`/`find_keys`/`get_sub`/`set_sub`.
//! - [`CblConfig`] tunes the cache-and-buffer layer (capacity, flush
//!   interval, wire format).
//! - [`WriteHandle`] carries the two completion signals a buffered write
//!   produces: buffer-accepted (already true by construction) and
//!   write-completed (resolves once the backend has durably applied it).
//! - [`FacadeError`]/[`FacadeResult`] are the error types every operation
//!   returns.
//!
//! Concrete backend drivers live in sibling crates (`kvbridge-memory`,
//! `kvbridge-redis`, `kvbridge-embedded`); this crate only depends on the
//! `Backend` trait itself.

#![warn(missing_docs)]

mod buffer;
mod cache;
mod cbl;
mod config;
mod error;
#[cfg(feature = "metrics")]
mod metrics;
mod facade;
mod pending_read;
mod pks;
mod subvalue;
mod write_handle;

pub use config::{CblConfig, CblConfigBuilder, DEFAULT_CACHE_CAP, DEFAULT_WRITE_INTERVAL};
pub use error::{FacadeError, FacadeResult};
pub use facade::Kvbridge;
pub use write_handle::WriteHandle;

pub use kvbridge_backend::{Backend, BackendError, BackendResult, BulkOp, Format, Raw};
pub use kvbridge_core::{glob_match, Key, KeyTooLong, Value, ValueError, DEFAULT_MAX_KEY_LEN};
