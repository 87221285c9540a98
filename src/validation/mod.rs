//! Validator suite
//!
//! Structure, quality, dependency and platform checks over a package tree.

pub mod constraint;
pub mod dependency;
mod findings;
pub mod manifest;
pub mod platform;
pub mod quality;
pub mod structure;
pub mod traits;

pub use dependency::DependencyValidator;
pub use platform::PlatformComplianceValidator;
pub use quality::QualityValidator;
pub use structure::StructureValidator;
pub use traits::{Validator, ValidatorKind};
