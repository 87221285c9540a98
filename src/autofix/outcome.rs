//! Per-message fix outcomes and run statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::diagnostic::ValidationMessage;

/// Classification of one processed message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixResultType {
    Success,
    Failed,
    Skipped,
    Unsupported,
}

impl FixResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixResultType::Success => "success",
            FixResultType::Failed => "failed",
            FixResultType::Skipped => "skipped",
            FixResultType::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for FixResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of processing one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixResult {
    pub kind: FixResultType,
    pub message: String,
    /// stderr of a failed command, launch error text, or guidance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Command that was run, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl FixResult {
    pub fn success(message: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            kind: FixResultType::Success,
            message: message.into(),
            details: None,
            command: Some(command.into()),
        }
    }

    pub fn failed(message: impl Into<String>, details: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            kind: FixResultType::Failed,
            message: message.into(),
            details: Some(details.into()),
            command: Some(command.into()),
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            kind: FixResultType::Skipped,
            message: message.into(),
            details: None,
            command: None,
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self {
            kind: FixResultType::Unsupported,
            message: message.into(),
            details: None,
            command: None,
        }
    }

    pub fn with_details(mut self, details: Option<String>) -> Self {
        self.details = details;
        self
    }

    pub fn is_failure(&self) -> bool {
        self.kind == FixResultType::Failed
    }
}

/// Outcome counters.
///
/// `total_issues` is the number of autofixable messages reported; the four
/// counters only cover messages actually processed, so on an aborted run
/// their sum is below `total_issues`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixStatistics {
    pub total_issues: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub unsupported_count: usize,
}

impl FixStatistics {
    pub fn new(total_issues: usize) -> Self {
        Self {
            total_issues,
            ..Self::default()
        }
    }

    /// Count one processed message
    pub fn record(&mut self, kind: FixResultType) {
        match kind {
            FixResultType::Success => self.success_count += 1,
            FixResultType::Failed => self.failed_count += 1,
            FixResultType::Skipped => self.skipped_count += 1,
            FixResultType::Unsupported => self.unsupported_count += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.success_count + self.failed_count + self.skipped_count + self.unsupported_count
    }

    /// Successful fixes over reported issues; 0 when nothing was reported
    pub fn fix_rate(&self) -> f64 {
        if self.total_issues == 0 {
            0.0
        } else {
            self.success_count as f64 / self.total_issues as f64
        }
    }

    /// Successful fixes over attempted commands (success + failed); 0 when
    /// nothing was attempted
    pub fn success_rate(&self) -> f64 {
        let attempted = self.success_count + self.failed_count;
        if attempted == 0 {
            0.0
        } else {
            self.success_count as f64 / attempted as f64
        }
    }

    /// Add another run's counters to these
    pub fn merge(&mut self, other: &FixStatistics) {
        self.total_issues += other.total_issues;
        self.success_count += other.success_count;
        self.failed_count += other.failed_count;
        self.skipped_count += other.skipped_count;
        self.unsupported_count += other.unsupported_count;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for FixStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} issues: {} fixed, {} failed, {} skipped, {} unsupported (fix rate {:.1}%, success rate {:.1}%)",
            self.total_issues,
            self.success_count,
            self.failed_count,
            self.skipped_count,
            self.unsupported_count,
            self.fix_rate() * 100.0,
            self.success_rate() * 100.0
        )
    }
}

/// One processed message and what happened to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixRecord {
    /// Position among the autofixable messages
    pub index: usize,
    pub message: ValidationMessage,
    pub result: FixResult,
}

/// Result of one remediation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixRun {
    /// Processed messages in order; stops at the failure on an aborted run
    pub records: Vec<FixRecord>,
    pub statistics: FixStatistics,
    /// Stopped early because a fix failed and `continue_on_error` was off
    pub aborted: bool,
}

impl FixRun {
    pub fn processed(&self) -> usize {
        self.records.len()
    }

    pub fn results(&self) -> impl Iterator<Item = &FixResult> {
        self.records.iter().map(|r| &r.result)
    }

    pub fn count(&self, kind: FixResultType) -> usize {
        self.results().filter(|r| r.kind == kind).count()
    }
}
