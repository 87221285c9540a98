//! On-disk cache store: one JSON entry file per key.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::traits::{CacheEntry, CacheStore};
use crate::error::{GateError, Result};

/// Stores each entry as `<dir>/<key>.json`.
///
/// Writes go to a uniquely named temporary file that is renamed into place,
/// so concurrent readers see either the old entry or the new one and
/// concurrent writers never share a temporary file. Expired or unreadable
/// entries are removed on read.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(GateError::Cache(format!("Invalid cache key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path)
            && e.kind() != ErrorKind::NotFound
        {
            log::warn!("Failed to remove stale cache entry {}: {}", path.display(), e);
        }
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Discarding corrupt cache entry {}: {}", path.display(), e);
                self.discard(&path);
                return Ok(None);
            }
        };

        if entry.key != key || entry.is_expired() {
            self.discard(&path);
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let path = self.entry_path(key)?;
        let entry = CacheEntry::new(key, value, ttl);

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", key))
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        tmp.write_all(&serde_json::to_vec(&entry)?)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<()> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json" || ext == "tmp") {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}
