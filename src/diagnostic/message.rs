//! Validation messages and fix suggestions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::Severity;

/// How a finding may be resolved. This is the remediation dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixabilityLevel {
    /// The engine may apply the fix without asking
    Automatic,
    /// A fix is known but a human should apply it
    Suggested,
    /// Requires human work; only guidance is available
    Manual,
    /// No fix exists
    Unfixable,
}

impl FixabilityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixabilityLevel::Automatic => "automatic",
            FixabilityLevel::Suggested => "suggested",
            FixabilityLevel::Manual => "manual",
            FixabilityLevel::Unfixable => "unfixable",
        }
    }
}

impl fmt::Display for FixabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured problem category, set by the emitting validator so the
/// remediation engine can pick a strategy without reading message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemType {
    Formatting,
    Imports,
    Configuration,
    Documentation,
}

impl ProblemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::Formatting => "formatting",
            ProblemType::Imports => "imports",
            ProblemType::Configuration => "configuration",
            ProblemType::Documentation => "documentation",
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hint for resolving a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixSuggestion {
    pub description: String,
    pub fixability: FixabilityLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<ProblemType>,
}

impl FixSuggestion {
    pub fn new(fixability: FixabilityLevel, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            fixability,
            command: None,
            code_example: None,
            documentation: None,
            problem_type: None,
        }
    }

    pub fn automatic(description: impl Into<String>) -> Self {
        Self::new(FixabilityLevel::Automatic, description)
    }

    pub fn suggested(description: impl Into<String>) -> Self {
        Self::new(FixabilityLevel::Suggested, description)
    }

    pub fn manual(description: impl Into<String>) -> Self {
        Self::new(FixabilityLevel::Manual, description)
    }

    pub fn unfixable(description: impl Into<String>) -> Self {
        Self::new(FixabilityLevel::Unfixable, description)
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_code_example(mut self, example: impl Into<String>) -> Self {
        self.code_example = Some(example.into());
        self
    }

    pub fn with_documentation(mut self, url: impl Into<String>) -> Self {
        self.documentation = Some(url.into());
        self
    }

    pub fn with_problem_type(mut self, problem_type: ProblemType) -> Self {
        self.problem_type = Some(problem_type);
        self
    }

    /// Whether the remediation engine should look at this suggestion at all.
    pub fn is_actionable(&self) -> bool {
        self.fixability != FixabilityLevel::Unfixable
    }
}

/// A single finding emitted by a validator.
///
/// Built with the constructors and `with_*` methods at emission time and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMessage {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_suggestion: Option<FixSuggestion>,
    /// Stable rule identifier, e.g. `structure.missing_directory`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// Name of the validator that emitted this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
}

impl ValidationMessage {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            file: None,
            line: None,
            fix_suggestion: None,
            rule: None,
            validator: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn with_file(mut self, file: impl AsRef<Path>) -> Self {
        self.file = Some(file.as_ref().to_path_buf());
        self
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_fix(mut self, fix: FixSuggestion) -> Self {
        self.fix_suggestion = Some(fix);
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn from_validator(mut self, validator: impl Into<String>) -> Self {
        self.validator = Some(validator.into());
        self
    }

    /// Autofixable: a suggestion exists and it is not `unfixable`.
    pub fn is_autofixable(&self) -> bool {
        self.fix_suggestion.as_ref().is_some_and(FixSuggestion::is_actionable)
    }

    /// `file:line` location for display, if any.
    pub fn location(&self) -> Option<String> {
        let file = self.file.as_ref()?;
        Some(match self.line {
            Some(line) => format!("{}:{}", file.display(), line),
            None => file.display().to_string(),
        })
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location() {
            Some(loc) => write!(f, "[{}] {} ({})", self.severity, self.message, loc),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}
