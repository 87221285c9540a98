//! modgate - a quality gate for generated Dart/Flutter packages
//!
//! Layered validators (structure, quality, dependency, platform compliance)
//! feed a typed diagnostic model; an orchestrator runs them, merges their
//! findings deterministically and caches the result, and an auto-fix manager
//! applies the subset of findings that can be repaired automatically.

pub mod autofix;
pub mod cache;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod orchestrator;
pub mod process;
pub mod tree;
pub mod validation;

pub use autofix::{AutoFixManager, AutoFixOptions, FixResult, FixResultType, FixRun, FixStatistics};
pub use diagnostic::{FixSuggestion, FixabilityLevel, ProblemType, Severity, ValidationLevel, ValidationMessage, ValidationResult};
pub use error::{GateError, Result};
pub use orchestrator::{OrchestratorConfig, ValidationOrchestrator};
