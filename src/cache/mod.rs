//! Result cache for validation runs.
//!
//! Entries hold a serialized `ValidationResult` keyed by
//! hash(target path, level, validator scope, tree fingerprint) and expire
//! after a TTL (30 minutes by default). Callers treat every cache error as a
//! miss.

mod file;
mod fingerprint;
mod memory;
mod traits;

pub use file::FileCacheStore;
pub use fingerprint::{cache_key, tree_fingerprint};
pub use memory::MemoryCacheStore;
pub use traits::{CacheEntry, CacheStore};

use std::time::Duration;

/// Default lifetime of a cached result
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);
