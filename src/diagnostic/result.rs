//! The merged outcome of one or more validators.

use serde::{Deserialize, Serialize};

use super::{Severity, ValidationLevel, ValidationMessage};

/// Ordered collection of validation messages.
///
/// Order is emission order within a validator and registration order across
/// validators. Consumers only get read access; validators and the
/// orchestrator build it through `push`/`merge`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    messages: Vec<ValidationMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    level: Option<ValidationLevel>,
    /// Names of the validators that contributed, in merge order
    #[serde(default)]
    validators: Vec<String>,
}

impl ValidationResult {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty result for a given level
    pub fn for_level(level: ValidationLevel) -> Self {
        Self {
            level: Some(level),
            ..Self::default()
        }
    }

    /// Create a result holding the given messages
    pub fn from_messages(messages: Vec<ValidationMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Append a message
    pub fn push(&mut self, message: ValidationMessage) {
        self.messages.push(message);
    }

    /// Record that a validator contributed to this result
    pub fn record_validator(&mut self, name: impl Into<String>) {
        self.validators.push(name.into());
    }

    /// Merge another result into this one, keeping its order after ours
    pub fn merge(&mut self, other: ValidationResult) {
        self.messages.extend(other.messages);
        self.validators.extend(other.validators);
        if self.level.is_none() {
            self.level = other.level;
        }
    }

    pub fn messages(&self) -> &[ValidationMessage] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationMessage> {
        self.messages.iter()
    }

    pub fn level(&self) -> Option<ValidationLevel> {
        self.level
    }

    pub fn validators(&self) -> &[String] {
        &self.validators
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages of exactly one severity, in order
    pub fn with_severity(&self, severity: Severity) -> Vec<&ValidationMessage> {
        self.messages.iter().filter(|m| m.severity == severity).collect()
    }

    pub fn errors(&self) -> Vec<&ValidationMessage> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> Vec<&ValidationMessage> {
        self.with_severity(Severity::Warning)
    }

    pub fn infos(&self) -> Vec<&ValidationMessage> {
        self.with_severity(Severity::Info)
    }

    pub fn successes(&self) -> Vec<&ValidationMessage> {
        self.with_severity(Severity::Success)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.messages.iter().filter(|m| m.severity == severity).count()
    }

    /// Messages the remediation engine will consider
    pub fn autofixable_messages(&self) -> Vec<&ValidationMessage> {
        self.messages.iter().filter(|m| m.is_autofixable()).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity == Severity::Error)
    }

    /// Validation passed: no Error-severity messages
    pub fn is_success(&self) -> bool {
        !self.has_errors()
    }

    /// Most severe message present
    pub fn max_severity(&self) -> Option<Severity> {
        self.messages.iter().map(|m| m.severity).max()
    }

    /// Logical exit status: 0 when validation passed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

impl FromIterator<ValidationMessage> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = ValidationMessage>>(iter: I) -> Self {
        Self::from_messages(iter.into_iter().collect())
    }
}
