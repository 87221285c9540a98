//! Message severity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a validation message is.
///
/// Variants are declared from least to most severe, so the derived ordering
/// lets callers write `severity >= Severity::Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A check ran and found nothing wrong
    Success,
    /// Informational note, never blocks
    Info,
    /// Should be addressed; escalated to Error in strict mode
    Warning,
    /// Must be fixed
    Error,
}

impl Severity {
    /// All severities, most severe first (report order).
    pub const ALL: [Severity; 4] = [Severity::Error, Severity::Warning, Severity::Info, Severity::Success];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Whether this severity is a finding rather than a confirmation.
    pub fn is_problem(&self) -> bool {
        matches!(self, Severity::Warning | Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
