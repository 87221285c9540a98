//! Diagnostic model shared by validators, the orchestrator and the
//! remediation engine.

pub mod level;
pub mod message;
pub mod result;
pub mod severity;

pub use level::ValidationLevel;
pub use message::{FixSuggestion, FixabilityLevel, ProblemType, ValidationMessage};
pub use result::ValidationResult;
pub use severity::Severity;
