//! Error types for modgate
//!
//! Centralized error handling using thiserror. These are infrastructure
//! errors only: problems found in the inspected package are reported as
//! `ValidationMessage` data, never as `GateError`.

use thiserror::Error;

/// All error types that can occur in modgate
#[derive(Debug, Error)]
pub enum GateError {
    /// A validation level string could not be parsed
    #[error("Invalid validation level: {0}")]
    InvalidLevel(String),

    /// The package manifest could not be read or parsed
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Result cache read/write error
    #[error("Cache error: {0}")]
    Cache(String),

    /// A validator failed internally
    #[error("Validator '{name}' failed: {message}")]
    Validator { name: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for modgate operations
pub type Result<T> = std::result::Result<T, GateError>;
