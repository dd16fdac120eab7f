//! TTL-capable key-value store seam.
//!
//! Every piece of OTP state lives behind this trait. Components receive an
//! `Arc<dyn KvStore>` explicitly; there is no global handle.

mod memory;
mod redis;

pub use self::memory::InMemoryStore;
pub use self::redis::RedisStore;

use std::time::Duration;

use async_trait::async_trait;
use passcode_common::OtpError;
use thiserror::Error;

/// Store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Corrupt value at {key}: {value:?}")]
    Corrupt { key: String, value: String },

    #[error("Store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for OtpError {
    fn from(err: StoreError) -> Self {
        OtpError::StoreUnavailable(err.to_string())
    }
}

/// One write inside an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Write `value` at `key`, expiring after `ttl`
    Set {
        key: String,
        value: String,
        ttl: Duration,
    },
    /// Remove all listed keys
    Del(Vec<String>),
}

impl StoreOp {
    pub fn set(key: impl Into<String>, value: impl Into<String>, ttl: Duration) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
            ttl,
        }
    }
}

/// Remaining lifetime of a present key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Stored without a TTL
    Persistent,
    /// Expires after this long; may be below one second
    In(Duration),
}

/// Key-value store with whole-second TTLs.
///
/// Expired keys are indistinguishable from absent ones.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remaining lifetime of a key; `None` when absent
    async fn ttl(&self, key: &str) -> Result<Option<Expiry>, StoreError>;

    /// Write a value with expiry
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Delete keys in a single call
    async fn del(&self, keys: &[String]) -> Result<(), StoreError>;

    /// Atomically delete `key` and `also`, but only while `key` still holds
    /// `expected`. Returns whether the delete happened.
    async fn del_if_eq(&self, key: &str, expected: &str, also: &[String])
        -> Result<bool, StoreError>;

    /// Atomically increment the integer at `key` unless it is already `>= cap`.
    ///
    /// Missing keys count as 0. On increment the TTL is reset to `ttl` and the
    /// new value returned; at the cap nothing is written and `None` returned.
    async fn incr_capped(&self, key: &str, cap: u64, ttl: Duration)
        -> Result<Option<u64>, StoreError>;

    /// Apply all ops as one atomic unit
    async fn apply(&self, ops: &[StoreOp]) -> Result<(), StoreError>;

    /// Connectivity probe
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Whole seconds, never zero (a zero TTL would mean "no expiry" or an error)
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
