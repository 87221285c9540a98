//! Validator contract shared by the suite and the orchestrator.

use crate::diagnostic::{ValidationLevel, ValidationResult};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which layer of the suite a validator belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorKind {
    Structure,
    Quality,
    Dependency,
    Platform,
}

impl ValidatorKind {
    pub const ALL: [ValidatorKind; 4] = [
        ValidatorKind::Structure,
        ValidatorKind::Quality,
        ValidatorKind::Dependency,
        ValidatorKind::Platform,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidatorKind::Structure => "structure",
            ValidatorKind::Quality => "quality",
            ValidatorKind::Dependency => "dependency",
            ValidatorKind::Platform => "platform",
        }
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidatorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structure" => Ok(ValidatorKind::Structure),
            "quality" => Ok(ValidatorKind::Quality),
            "dependency" | "dependencies" => Ok(ValidatorKind::Dependency),
            "platform" | "compliance" => Ok(ValidatorKind::Platform),
            other => Err(format!("unknown validator: {}", other)),
        }
    }
}

/// A read-only check over a package tree
#[async_trait]
pub trait Validator: Send + Sync {
    /// Inspect the tree rooted at `target` under the given level.
    ///
    /// Must not modify anything under `target`. Problems in the package are
    /// returned as messages; `Err` is reserved for the validator itself
    /// breaking, which the orchestrator turns into a single Error message.
    async fn validate(&self, target: &Path, level: ValidationLevel) -> Result<ValidationResult>;

    /// Short stable name, used in messages and cache keys
    fn name(&self) -> &str;

    fn kind(&self) -> ValidatorKind;

    /// Lowest level at which this validator runs at all
    fn min_level(&self) -> ValidationLevel {
        ValidationLevel::Basic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::ValidationMessage;

    struct MockValidator {
        should_pass: bool,
    }

    #[async_trait]
    impl Validator for MockValidator {
        async fn validate(&self, _target: &Path, level: ValidationLevel) -> Result<ValidationResult> {
            let mut result = ValidationResult::for_level(level);
            if self.should_pass {
                result.push(ValidationMessage::success("mock passed"));
            } else {
                result.push(ValidationMessage::error("mock failure"));
            }
            Ok(result)
        }

        fn name(&self) -> &str {
            "mock"
        }

        fn kind(&self) -> ValidatorKind {
            ValidatorKind::Structure
        }
    }

    #[tokio::test]
    async fn test_validator_trait_pass() {
        let validator = MockValidator { should_pass: true };
        let result = validator
            .validate(Path::new("/tmp/pkg"), ValidationLevel::Standard)
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.level(), Some(ValidationLevel::Standard));
    }

    #[tokio::test]
    async fn test_validator_trait_fail() {
        let validator = MockValidator { should_pass: false };
        let result = validator
            .validate(Path::new("/tmp/pkg"), ValidationLevel::Basic)
            .await
            .unwrap();
        assert!(result.has_errors());
    }

    #[test]
    fn test_default_min_level_is_basic() {
        let validator = MockValidator { should_pass: true };
        assert_eq!(validator.min_level(), ValidationLevel::Basic);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("Quality".parse::<ValidatorKind>().unwrap(), ValidatorKind::Quality);
        assert_eq!("dependencies".parse::<ValidatorKind>().unwrap(), ValidatorKind::Dependency);
        assert_eq!("compliance".parse::<ValidatorKind>().unwrap(), ValidatorKind::Platform);
        assert!("lint".parse::<ValidatorKind>().is_err());
    }

    #[test]
    fn test_kind_display() {
        let names: Vec<String> = ValidatorKind::ALL.iter().map(|k| k.to_string()).collect();
        assert_eq!(names, vec!["structure", "quality", "dependency", "platform"]);
    }
}
