//! Message collector used by the built-in validators.

use crate::diagnostic::{Severity, ValidationLevel, ValidationMessage, ValidationResult};

/// Accumulates one validator's messages in emission order and stamps each
/// with the validator name.
pub(crate) struct Findings {
    validator: &'static str,
    level: ValidationLevel,
    result: ValidationResult,
}

impl Findings {
    pub(crate) fn new(validator: &'static str, level: ValidationLevel) -> Self {
        Self {
            validator,
            level,
            result: ValidationResult::for_level(level),
        }
    }

    pub(crate) fn level(&self) -> ValidationLevel {
        self.level
    }

    pub(crate) fn push(&mut self, message: ValidationMessage) {
        self.result.push(message.from_validator(self.validator));
    }

    /// Emit an advisory finding at the level's warning severity
    pub(crate) fn advise(&mut self, message: ValidationMessage) {
        let severity = self.level.warning_severity();
        self.push(ValidationMessage { severity, ..message });
    }

    pub(crate) fn has_problems(&self) -> bool {
        self.result.iter().any(|m| m.severity.is_problem())
    }

    pub(crate) fn count(&self, severity: Severity) -> usize {
        self.result.count(severity)
    }

    /// Close the collection, adding `success` when nothing was wrong
    pub(crate) fn finish(mut self, success: &str) -> ValidationResult {
        if !self.has_problems() {
            self.push(ValidationMessage::success(success));
        }
        self.result.record_validator(self.validator);
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_stamps_validator() {
        let mut findings = Findings::new("structure", ValidationLevel::Standard);
        findings.push(ValidationMessage::info("note"));
        let result = findings.finish("all good");
        assert_eq!(result.messages()[0].validator.as_deref(), Some("structure"));
        assert_eq!(result.validators(), &["structure".to_string()]);
    }

    #[test]
    fn test_advise_follows_level() {
        let mut standard = Findings::new("x", ValidationLevel::Standard);
        standard.advise(ValidationMessage::info("advisory"));
        assert_eq!(standard.count(Severity::Warning), 1);

        let mut strict = Findings::new("x", ValidationLevel::Strict);
        strict.advise(ValidationMessage::info("advisory"));
        assert_eq!(strict.count(Severity::Error), 1);
    }

    #[test]
    fn test_finish_adds_success_only_when_clean() {
        let clean = Findings::new("x", ValidationLevel::Basic).finish("clean");
        assert_eq!(clean.successes().len(), 1);

        let mut dirty = Findings::new("x", ValidationLevel::Basic);
        dirty.push(ValidationMessage::warning("w"));
        let dirty = dirty.finish("clean");
        assert!(dirty.successes().is_empty());

        let mut informational = Findings::new("x", ValidationLevel::Basic);
        informational.push(ValidationMessage::info("fyi"));
        assert_eq!(informational.finish("clean").successes().len(), 1);
    }
}
