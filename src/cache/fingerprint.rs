//! Content fingerprints and cache keys.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::diagnostic::ValidationLevel;
use crate::error::Result;
use crate::tree;

/// SHA-256 over every directory path, file path and file content, in sorted
/// path order.
///
/// Any added, removed, renamed or edited file changes the fingerprint, and so
/// does creating or removing a directory, even an empty one. Directories
/// named in `ignored` are skipped.
pub fn tree_fingerprint(root: &Path, ignored: &[String]) -> Result<String> {
    let listing = tree::walk(root, ignored)?;
    let mut hasher = Sha256::new();
    for dir in &listing.dirs {
        hasher.update(b"d");
        hasher.update(dir.to_string_lossy().as_bytes());
        hasher.update([0u8]);
    }
    for (path, _) in &listing.unreadable {
        hasher.update(b"u");
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update([0u8]);
    }
    for relative in &listing.files {
        hasher.update(b"f");
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(fs::read(root.join(relative))?);
        hasher.update([0u8]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Cache key for one orchestrator run.
///
/// `scope` names the validators taking part so a subset run never answers
/// for a full one.
pub fn cache_key(target: &Path, level: ValidationLevel, scope: &[&str], fingerprint: &str) -> String {
    let canonical = target.canonicalize().unwrap_or_else(|_| target.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    hasher.update([0u8]);
    hasher.update(level.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(scope.join(",").as_bytes());
    hasher.update([0u8]);
    hasher.update(fingerprint.as_bytes());
    hex::encode(hasher.finalize())
}
