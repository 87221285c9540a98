//! Validation level: the strictness tier every validator consults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Severity;
use crate::error::GateError;

/// Ordered strictness tier.
///
/// - `Basic`: structural and must-fix rules only
/// - `Standard`: adds quality and dependency rules as warnings
/// - `Strict`: those warnings become errors
/// - `Enterprise`: full rule set plus stricter coverage/security thresholds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    Basic,
    #[default]
    Standard,
    Strict,
    Enterprise,
}

impl ValidationLevel {
    pub const ALL: [ValidationLevel; 4] = [
        ValidationLevel::Basic,
        ValidationLevel::Standard,
        ValidationLevel::Strict,
        ValidationLevel::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationLevel::Basic => "basic",
            ValidationLevel::Standard => "standard",
            ValidationLevel::Strict => "strict",
            ValidationLevel::Enterprise => "enterprise",
        }
    }

    /// Whether rules beyond must-fix are active.
    pub fn includes_advisory_rules(&self) -> bool {
        *self >= ValidationLevel::Standard
    }

    /// Whether warnings from advisory rules are promoted to errors.
    pub fn escalates_warnings(&self) -> bool {
        *self >= ValidationLevel::Strict
    }

    pub fn is_enterprise(&self) -> bool {
        *self == ValidationLevel::Enterprise
    }

    /// Severity an advisory rule should emit at this level.
    pub fn warning_severity(&self) -> Severity {
        if self.escalates_warnings() {
            Severity::Error
        } else {
            Severity::Warning
        }
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationLevel {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(ValidationLevel::Basic),
            "standard" => Ok(ValidationLevel::Standard),
            "strict" => Ok(ValidationLevel::Strict),
            "enterprise" => Ok(ValidationLevel::Enterprise),
            other => Err(GateError::InvalidLevel(other.to_string())),
        }
    }
}
