//! Cache store abstraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;

/// One stored value and its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            key: key.into(),
            value: value.into(),
            expires_at: Utc::now().checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Key/value store with per-entry expiry.
///
/// Implementations must be safe for concurrent use from several orchestrator
/// runs. Expired entries are never returned by `get`.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Drop every entry
    fn clear(&self) -> Result<()>;
}
