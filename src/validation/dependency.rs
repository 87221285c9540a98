//! Dependency validator: manifest constraints, sources and advisories.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;

use super::constraint::{Version, VersionConstraint};
use super::findings::Findings;
use super::manifest::{Dependency, DependencySection, DependencySource, Manifest, ManifestState};
use super::traits::{Validator, ValidatorKind};
use crate::config::{RulesConfig, Toolchain};
use crate::diagnostic::{FixSuggestion, ProblemType, ValidationLevel, ValidationMessage, ValidationResult};
use crate::error::Result;

const NAME: &str = "dependency";
const DEPENDENCY_DOCS: &str = "https://dart.dev/tools/pub/dependencies";
const CONSTRAINT_DOCS: &str = "https://dart.dev/tools/pub/dependencies#version-constraints";

/// Parses the package manifest and checks its dependency declarations.
pub struct DependencyValidator {
    toolchain: Toolchain,
    rules: RulesConfig,
}

impl DependencyValidator {
    pub fn new(toolchain: Toolchain, rules: RulesConfig) -> Self {
        Self { toolchain, rules }
    }

    fn located(&self, manifest: &Manifest, dep: &Dependency, message: ValidationMessage) -> ValidationMessage {
        let message = message.with_file(manifest.path());
        match manifest.line_of_nested(dep.section.key(), &dep.name) {
            Some(line) => message.at_line(line),
            None => message,
        }
    }

    fn check_sdk(&self, manifest: &Manifest, findings: &mut Findings) {
        let Some(sdk) = manifest.environment("sdk") else {
            let mut message = ValidationMessage::error("No SDK constraint declared under 'environment'")
                .with_file(manifest.path())
                .with_rule("dependency.missing_sdk_constraint")
                .with_fix(
                    FixSuggestion::manual("Declare the SDK versions the package supports")
                        .with_code_example("environment:\n  sdk: ^3.0.0\n")
                        .with_problem_type(ProblemType::Configuration)
                        .with_documentation(CONSTRAINT_DOCS),
                );
            if let Some(line) = manifest.line_of("environment") {
                message = message.at_line(line);
            }
            findings.push(message);
            return;
        };

        if let Err(e) = sdk.parse::<VersionConstraint>() {
            let mut message = ValidationMessage::error(format!("SDK constraint '{}' is malformed: {}", sdk, e))
                .with_file(manifest.path())
                .with_rule("dependency.invalid_constraint")
                .with_fix(FixSuggestion::manual("Use a constraint such as '^3.0.0'").with_documentation(CONSTRAINT_DOCS));
            if let Some(line) = manifest.line_of_nested("environment", "sdk") {
                message = message.at_line(line);
            }
            findings.push(message);
        }
    }

    fn check_declaration(&self, manifest: &Manifest, dep: &Dependency, findings: &mut Findings) {
        let advisory_rules = findings.level().includes_advisory_rules();

        match &dep.source {
            DependencySource::Hosted { constraint: None } => {
                if advisory_rules && dep.section != DependencySection::Override {
                    findings.advise(self.located(
                        manifest,
                        dep,
                        ValidationMessage::warning(format!("Dependency '{}' has no version constraint", dep.name))
                            .with_rule("dependency.unbounded_constraint")
                            .with_fix(bounded_constraint_fix(&dep.name)),
                    ));
                }
            }
            DependencySource::Hosted {
                constraint: Some(text),
            } => match text.parse::<VersionConstraint>() {
                Err(e) => findings.push(self.located(
                    manifest,
                    dep,
                    ValidationMessage::error(format!("Dependency '{}' has a malformed constraint '{}': {}", dep.name, text, e))
                        .with_rule("dependency.invalid_constraint")
                        .with_fix(FixSuggestion::manual("Use a caret or range constraint").with_documentation(CONSTRAINT_DOCS)),
                )),
                Ok(constraint) => {
                    if advisory_rules && constraint.is_open_ended() && dep.section != DependencySection::Override {
                        findings.advise(self.located(
                            manifest,
                            dep,
                            ValidationMessage::warning(format!(
                                "Dependency '{}' constraint '{}' has no upper bound",
                                dep.name, text
                            ))
                            .with_rule("dependency.unbounded_constraint")
                            .with_fix(bounded_constraint_fix(&dep.name)),
                        ));
                    }
                    if advisory_rules {
                        self.check_advisories(manifest, dep, &constraint, findings);
                    }
                }
            },
            DependencySource::Git { url, git_ref: None } => {
                if advisory_rules {
                    findings.advise(self.located(
                        manifest,
                        dep,
                        ValidationMessage::warning(format!("Git dependency '{}' is not pinned to a ref ({})", dep.name, url))
                            .with_rule("dependency.unpinned_git")
                            .with_fix(
                                FixSuggestion::suggested("Pin the dependency to a tag or commit")
                                    .with_code_example(format!("{}:\n  git:\n    url: {}\n    ref: v1.0.0\n", dep.name, url))
                                    .with_documentation(DEPENDENCY_DOCS),
                            ),
                    ));
                }
            }
            DependencySource::Git { .. } | DependencySource::Sdk(_) => {}
            DependencySource::Path(path) => {
                if advisory_rules && dep.section == DependencySection::Regular {
                    findings.advise(self.located(
                        manifest,
                        dep,
                        ValidationMessage::warning(format!(
                            "Dependency '{}' points at a local path ({}); the package cannot be published",
                            dep.name, path
                        ))
                        .with_rule("dependency.path_dependency")
                        .with_fix(
                            FixSuggestion::suggested("Depend on a published version instead")
                                .with_documentation(DEPENDENCY_DOCS),
                        ),
                    ));
                }
            }
            DependencySource::Unrecognized(reason) => findings.push(self.located(
                manifest,
                dep,
                ValidationMessage::error(format!("Dependency '{}' cannot be understood: {}", dep.name, reason))
                    .with_rule("dependency.unrecognized_source")
                    .with_fix(FixSuggestion::manual("Declare a version constraint, or a git, path or sdk source").with_documentation(DEPENDENCY_DOCS)),
            )),
        }
    }

    fn check_advisories(&self, manifest: &Manifest, dep: &Dependency, constraint: &VersionConstraint, findings: &mut Findings) {
        for advisory in self.rules.advisories.iter().filter(|a| a.package == dep.name) {
            let fixed_in: Version = match advisory.fixed_in.parse() {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("Ignoring advisory for '{}': {}", advisory.package, e);
                    continue;
                }
            };
            if constraint.allows_below(&fixed_in) {
                findings.advise(self.located(
                    manifest,
                    dep,
                    ValidationMessage::warning(format!(
                        "Dependency '{}' allows versions affected by a known vulnerability: {}",
                        dep.name, advisory.summary
                    ))
                    .with_rule("dependency.insecure_version")
                    .with_fix(
                        FixSuggestion::suggested(format!("Require version {} or later", fixed_in))
                            .with_code_example(format!("{}: ^{}\n", dep.name, fixed_in))
                            .with_documentation(CONSTRAINT_DOCS),
                    ),
                ));
            }
        }
    }

    fn check_conflicts(&self, manifest: &Manifest, findings: &mut Findings) {
        let regular: HashSet<String> = manifest
            .section(DependencySection::Regular)
            .into_iter()
            .map(|d| d.name)
            .collect();

        for dep in manifest.section(DependencySection::Dev) {
            if regular.contains(&dep.name) {
                findings.push(self.located(
                    manifest,
                    &dep,
                    ValidationMessage::error(format!(
                        "'{}' is declared in both dependencies and dev_dependencies",
                        dep.name
                    ))
                    .with_rule("dependency.conflicting_declaration")
                    .with_fix(FixSuggestion::manual("Keep a single declaration").with_documentation(DEPENDENCY_DOCS)),
                ));
            }
        }
    }

    fn check_overrides(&self, manifest: &Manifest, findings: &mut Findings) {
        for dep in manifest.section(DependencySection::Override) {
            findings.advise(self.located(
                manifest,
                &dep,
                ValidationMessage::warning(format!("Dependency override for '{}' hides resolution conflicts", dep.name))
                    .with_rule("dependency.override")
                    .with_fix(
                        FixSuggestion::suggested("Remove the override once the conflict is resolved upstream")
                            .with_documentation("https://dart.dev/tools/pub/dependencies#dependency-overrides"),
                    ),
            ));
        }
    }

    fn check_lockfile(&self, target: &Path, manifest: &Manifest, findings: &mut Findings) {
        if target.join(&self.toolchain.lockfile).is_file() {
            return;
        }
        findings.push(
            ValidationMessage::info(format!("'{}' is missing; dependencies have not been resolved", self.toolchain.lockfile))
                .with_file(manifest.path())
                .with_rule("dependency.missing_lockfile")
                .with_fix(
                    FixSuggestion::automatic("Resolve dependencies")
                        .with_problem_type(ProblemType::Configuration)
                        .with_documentation("https://dart.dev/tools/pub/cmd/pub-get"),
                ),
        );
    }

    fn check_enterprise(&self, manifest: &Manifest, findings: &mut Findings) {
        let direct = manifest
            .section(DependencySection::Regular)
            .into_iter()
            .filter(|d| !matches!(d.source, DependencySource::Sdk(_)))
            .count();
        if direct > self.rules.enterprise_max_dependencies {
            findings.push(
                ValidationMessage::error(format!(
                    "{} direct dependencies exceed the enterprise limit of {}",
                    direct, self.rules.enterprise_max_dependencies
                ))
                .with_file(manifest.path())
                .with_rule("dependency.too_many_dependencies")
                .with_fix(FixSuggestion::manual("Remove or consolidate dependencies")),
            );
        }

        let dev = manifest.section(DependencySection::Dev);
        if !dev.iter().any(|d| self.rules.lint_packages.contains(&d.name)) {
            let suggested = self.rules.lint_packages.first().map(String::as_str).unwrap_or("lints");
            findings.push(
                ValidationMessage::error("No lint package is declared in dev_dependencies")
                    .with_file(manifest.path())
                    .with_rule("dependency.missing_lint_package")
                    .with_fix(
                        FixSuggestion::manual(format!("Add one of: {}", self.rules.lint_packages.join(", ")))
                            .with_code_example(format!("dev_dependencies:\n  {}: ^3.0.0\n", suggested))
                            .with_problem_type(ProblemType::Configuration)
                            .with_documentation("https://dart.dev/tools/analysis"),
                    ),
            );
        }
    }
}

impl Default for DependencyValidator {
    fn default() -> Self {
        Self::new(Toolchain::default(), RulesConfig::default())
    }
}

fn bounded_constraint_fix(name: &str) -> FixSuggestion {
    FixSuggestion::suggested("Use a caret constraint so breaking releases are not picked up")
        .with_code_example(format!("{}: ^1.0.0\n", name))
        .with_documentation(CONSTRAINT_DOCS)
}

#[async_trait]
impl Validator for DependencyValidator {
    async fn validate(&self, target: &Path, level: ValidationLevel) -> Result<ValidationResult> {
        let mut findings = Findings::new(NAME, level);

        let manifest = match Manifest::load(target, &self.toolchain.manifest_file) {
            ManifestState::Loaded(manifest) => manifest,
            ManifestState::Missing => {
                findings.push(
                    ValidationMessage::info(format!(
                        "No '{}' found; dependency checks skipped",
                        self.toolchain.manifest_file
                    ))
                    .with_rule("dependency.manifest_missing"),
                );
                return Ok(findings.finish("Dependency checks skipped"));
            }
            ManifestState::Invalid(reason) => {
                findings.push(
                    ValidationMessage::error(format!("'{}' is not valid YAML: {}", self.toolchain.manifest_file, reason))
                        .with_file(&self.toolchain.manifest_file)
                        .with_rule("dependency.manifest_invalid")
                        .with_fix(
                            FixSuggestion::manual("Fix the manifest syntax")
                                .with_problem_type(ProblemType::Configuration)
                                .with_documentation("https://dart.dev/tools/pub/pubspec"),
                        ),
                );
                return Ok(findings.finish("Dependencies are well formed"));
            }
        };

        self.check_sdk(&manifest, &mut findings);
        for dep in manifest.dependencies() {
            self.check_declaration(&manifest, &dep, &mut findings);
        }
        self.check_conflicts(&manifest, &mut findings);

        if level.includes_advisory_rules() {
            self.check_overrides(&manifest, &mut findings);
            self.check_lockfile(target, &manifest, &mut findings);
        }
        if level.is_enterprise() {
            self.check_enterprise(&manifest, &mut findings);
        }

        tracing::debug!(dependencies = manifest.dependencies().len(), ?level, "Dependency checks finished");
        Ok(findings.finish("Dependencies are well formed"))
    }

    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Dependency
    }
}
