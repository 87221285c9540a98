//! In-process cache store.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use super::traits::{CacheEntry, CacheStore};
use crate::error::{GateError, Result};

/// Cache held in a `RwLock<HashMap>`; lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        {
            let entries = self.entries.read().map_err(|e| GateError::Cache(e.to_string()))?;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        self.entries
            .write()
            .map_err(|e| GateError::Cache(e.to_string()))?
            .remove(key);
        Ok(None)
    }

    fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(key, value, ttl);
        self.entries
            .write()
            .map_err(|e| GateError::Cache(e.to_string()))?
            .insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(|e| GateError::Cache(e.to_string()))?
            .remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.write().map_err(|e| GateError::Cache(e.to_string()))?.clear();
        Ok(())
    }
}
