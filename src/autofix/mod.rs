//! Auto-remediation engine.
//!
//! Walks the autofixable messages of a `ValidationResult` one at a time, in
//! order, and classifies each as success, failed, skipped or unsupported.
//! Only `automatic` suggestions ever run a command; commands run through the
//! injected `ProcessExecutor` in the configured working directory.

mod exclude;
mod outcome;
mod strategy;

pub use exclude::ExcludeSet;
pub use outcome::{FixRecord, FixResult, FixResultType, FixRun, FixStatistics};
pub use strategy::{classify_problem, resolve_problem};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{AutoFixConfig, Toolchain};
use crate::diagnostic::{FixSuggestion, FixabilityLevel, ProblemType, ValidationMessage, ValidationResult};
use crate::process::{ProcessExecutor, render_command};

/// Manager settings
#[derive(Debug, Clone)]
pub struct AutoFixOptions {
    /// Directory commands run in; the target package root
    pub working_directory: PathBuf,
    /// Keep going after a failed fix
    pub continue_on_error: bool,
    /// Messages whose file matches any of these are skipped
    pub exclude_patterns: Vec<String>,
}

impl AutoFixOptions {
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            continue_on_error: true,
            exclude_patterns: Vec::new(),
        }
    }

    pub fn from_config(config: &AutoFixConfig, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            continue_on_error: config.continue_on_error,
            exclude_patterns: config.exclude_patterns.clone(),
        }
    }

    pub fn continue_on_error(mut self, value: bool) -> Self {
        self.continue_on_error = value;
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }
}

/// Applies fixes for validation messages.
pub struct AutoFixManager {
    options: AutoFixOptions,
    excludes: ExcludeSet,
    toolchain: Toolchain,
    executor: Arc<dyn ProcessExecutor>,
    statistics: FixStatistics,
}

impl AutoFixManager {
    pub fn new(options: AutoFixOptions, toolchain: Toolchain, executor: Arc<dyn ProcessExecutor>) -> Self {
        let excludes = ExcludeSet::new(&options.exclude_patterns);
        Self {
            options,
            excludes,
            toolchain,
            executor,
            statistics: FixStatistics::default(),
        }
    }

    pub fn options(&self) -> &AutoFixOptions {
        &self.options
    }

    /// Statistics accumulated over every run since creation or the last reset
    pub fn statistics(&self) -> &FixStatistics {
        &self.statistics
    }

    pub fn reset_statistics(&mut self) {
        self.statistics.reset();
    }

    /// Process every autofixable message in `result`, in order.
    ///
    /// With `continue_on_error` off, the first failed fix ends the run;
    /// later messages are neither processed nor counted.
    pub async fn fix(&mut self, result: &ValidationResult) -> FixRun {
        let fixable = result.autofixable_messages();
        let mut run = FixRun {
            statistics: FixStatistics::new(fixable.len()),
            ..FixRun::default()
        };

        if fixable.is_empty() {
            log::info!("No auto-fixable issues");
            return run;
        }

        log::info!(
            "Auto-fixing {} issues in {}",
            fixable.len(),
            self.options.working_directory.display()
        );

        for (index, message) in fixable.into_iter().enumerate() {
            let outcome = self.process_message(message).await;
            run.statistics.record(outcome.kind);
            log_outcome(message, &outcome);

            let stop = outcome.is_failure() && !self.options.continue_on_error;
            run.records.push(FixRecord {
                index,
                message: message.clone(),
                result: outcome,
            });
            if stop {
                log::warn!("Stopping after failed fix; continue_on_error is off");
                run.aborted = true;
                break;
            }
        }

        log::info!("Auto-fix report: {}", run.statistics);
        tracing::info!(
            total = run.statistics.total_issues,
            processed = run.processed(),
            success = run.statistics.success_count,
            failed = run.statistics.failed_count,
            skipped = run.statistics.skipped_count,
            unsupported = run.statistics.unsupported_count,
            fix_rate = run.statistics.fix_rate(),
            success_rate = run.statistics.success_rate(),
            aborted = run.aborted,
            "Auto-fix finished"
        );

        self.statistics.merge(&run.statistics);
        run
    }

    /// Classify and, for automatic fixes, apply a single message.
    ///
    /// Never fails: launch errors and non-zero exits come back as
    /// `FixResultType::Failed`.
    pub async fn process_message(&self, message: &ValidationMessage) -> FixResult {
        if let Some(file) = &message.file
            && let Some(pattern) = self.excludes.matching(file)
        {
            return FixResult::skipped(format!("Excluded by pattern '{}'", pattern));
        }

        let Some(fix) = &message.fix_suggestion else {
            return FixResult::unsupported("No fix suggestion");
        };

        match fix.fixability {
            FixabilityLevel::Manual => {
                FixResult::skipped(format!("Manual fix required: {}", fix.description)).with_details(fix.documentation.clone())
            }
            FixabilityLevel::Suggested => {
                FixResult::skipped(format!("Suggested fix: {}", fix.description)).with_details(guidance(fix))
            }
            FixabilityLevel::Unfixable => FixResult::unsupported(format!("No fix available: {}", fix.description)),
            FixabilityLevel::Automatic => match &fix.command {
                Some(command) => self.execute(command, &fix.description).await,
                None => self.apply_strategy(message, fix).await,
            },
        }
    }

    async fn apply_strategy(&self, message: &ValidationMessage, fix: &FixSuggestion) -> FixResult {
        let file = message.file.as_deref();

        match resolve_problem(message) {
            Some(ProblemType::Formatting) => match file {
                Some(path) if self.toolchain.is_source_file(path) => {
                    let command = render_command(&self.toolchain.format_command, Some(path), &[]);
                    self.execute(&command, "Format file").await
                }
                Some(path) => FixResult::unsupported(format!("Cannot format '{}': not a source file", path.display())),
                None => FixResult::unsupported("Cannot format: message has no file"),
            },
            Some(ProblemType::Imports) => {
                let command = render_command(&self.toolchain.imports_command, file, &[]);
                self.execute(&command, "Organize imports").await
            }
            Some(ProblemType::Configuration) => self.fix_configuration(file).await,
            Some(ProblemType::Documentation) => {
                FixResult::skipped("Documentation must be written by hand").with_details(guidance(fix))
            }
            None => FixResult::unsupported(format!("No fix strategy for: {}", message.message)),
        }
    }

    async fn fix_configuration(&self, file: Option<&Path>) -> FixResult {
        match file {
            Some(path) if self.toolchain.is_manifest(path) => {
                let command = self.toolchain.dependency_command.clone();
                self.execute(&command, "Resolve dependencies").await
            }
            Some(path) if self.toolchain.is_lint_config(path) => FixResult::skipped(format!(
                "Lint configuration '{}' needs a human decision",
                path.display()
            ))
            .with_details(Some("https://dart.dev/tools/analysis".to_string())),
            Some(path) => FixResult::unsupported(format!("No configuration fix for '{}'", path.display())),
            None => FixResult::unsupported("No configuration fix: message has no file"),
        }
    }

    async fn execute(&self, command: &str, description: &str) -> FixResult {
        match self.executor.run(command, &self.options.working_directory).await {
            Ok(output) if output.success() => FixResult::success(description, command),
            Ok(output) => {
                let stderr = output.stderr.trim();
                let details = if stderr.is_empty() {
                    format!("exit code {}", output.exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))
                } else {
                    stderr.to_string()
                };
                FixResult::failed(format!("{} failed", description), details, command)
            }
            Err(e) => FixResult::failed(format!("{} could not run", description), e.to_string(), command),
        }
    }
}

/// Code example and documentation link, when present
fn guidance(fix: &FixSuggestion) -> Option<String> {
    let parts: Vec<&str> = [fix.code_example.as_deref(), fix.documentation.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if parts.is_empty() { None } else { Some(parts.join("\n")) }
}

fn log_outcome(message: &ValidationMessage, outcome: &FixResult) {
    let location = message.location().unwrap_or_else(|| "-".to_string());
    match outcome.kind {
        FixResultType::Failed => log::warn!(
            "[{}] {}: {} ({})",
            outcome.kind,
            location,
            outcome.message,
            outcome.details.as_deref().unwrap_or("")
        ),
        _ => log::info!("[{}] {}: {}", outcome.kind, location, outcome.message),
    }
    tracing::debug!(
        kind = %outcome.kind,
        location = %location,
        command = outcome.command.as_deref().unwrap_or(""),
        "Processed message"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{MockExecutor, MockResponse};

    fn automatic(text: &str, command: &str) -> ValidationMessage {
        ValidationMessage::warning(text)
            .with_file("lib/a.dart")
            .with_fix(FixSuggestion::automatic(text).with_command(command))
    }

    fn scenario() -> ValidationResult {
        ValidationResult::from_messages(vec![
            automatic("fix one", "fix-1"),
            automatic("fix two", "fix-2"),
            automatic("fix three", "fix-3"),
            ValidationMessage::warning("suggested")
                .with_fix(FixSuggestion::suggested("try this").with_code_example("x = 1;")),
            ValidationMessage::error("manual").with_fix(FixSuggestion::manual("do it by hand")),
        ])
    }

    fn manager(executor: Arc<MockExecutor>, continue_on_error: bool) -> AutoFixManager {
        AutoFixManager::new(
            AutoFixOptions::new("/pkg").continue_on_error(continue_on_error),
            Toolchain::default(),
            executor,
        )
    }

    fn failing_third() -> Arc<MockExecutor> {
        Arc::new(MockExecutor::new().on("fix-3", MockResponse::fail(1, "could not rewrite")))
    }

    #[tokio::test]
    async fn test_stops_at_first_failure_without_continue() {
        let executor = failing_third();
        let mut manager = manager(executor.clone(), false);
        let run = manager.fix(&scenario()).await;

        assert!(run.aborted);
        assert_eq!(run.processed(), 3);
        assert_eq!(run.statistics.total_issues, 5);
        assert_eq!(
            (
                run.statistics.success_count,
                run.statistics.failed_count,
                run.statistics.skipped_count,
                run.statistics.unsupported_count
            ),
            (2, 1, 0, 0)
        );
        assert_eq!(executor.commands(), vec!["fix-1", "fix-2", "fix-3"]);

        let failed = &run.records[2].result;
        assert_eq!(failed.details.as_deref(), Some("could not rewrite"));
        assert_eq!(failed.command.as_deref(), Some("fix-3"));
    }

    #[tokio::test]
    async fn test_processes_everything_with_continue() {
        let executor = failing_third();
        let mut manager = manager(executor.clone(), true);
        let run = manager.fix(&scenario()).await;

        assert!(!run.aborted);
        assert_eq!(run.processed(), 5);
        let s = run.statistics;
        assert_eq!((s.success_count, s.failed_count, s.skipped_count, s.unsupported_count), (2, 1, 2, 0));
        assert_eq!(s.processed(), s.total_issues);
        assert_eq!(executor.call_count(), 3);
        assert!((s.fix_rate() - 0.4).abs() < 1e-9);
        assert!((s.success_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unfixable_is_unsupported_without_execution() {
        let executor = Arc::new(MockExecutor::new());
        let manager = manager(executor.clone(), true);
        let message = ValidationMessage::error("cannot fix").with_fix(FixSuggestion::unfixable("nothing to do"));

        let outcome = manager.process_message(&message).await;
        assert_eq!(outcome.kind, FixResultType::Unsupported);
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_suggestion_is_unsupported() {
        let manager = manager(Arc::new(MockExecutor::new()), true);
        let outcome = manager.process_message(&ValidationMessage::warning("bare")).await;
        assert_eq!(outcome.kind, FixResultType::Unsupported);
    }

    #[tokio::test]
    async fn test_empty_result_yields_zero_statistics() {
        let mut manager = manager(Arc::new(MockExecutor::new()), true);
        let result = ValidationResult::from_messages(vec![
            ValidationMessage::info("fyi"),
            ValidationMessage::error("no fix").with_fix(FixSuggestion::unfixable("none")),
        ]);
        let run = manager.fix(&result).await;
        assert_eq!(run.statistics, FixStatistics::default());
        assert_eq!(run.statistics.fix_rate(), 0.0);
        assert!(run.records.is_empty());
    }

    #[tokio::test]
    async fn test_excluded_files_are_skipped_before_dispatch() {
        let executor = Arc::new(MockExecutor::new());
        let mut manager = AutoFixManager::new(
            AutoFixOptions::new("/pkg").exclude("*.g.dart"),
            Toolchain::default(),
            executor.clone(),
        );
        let result = ValidationResult::from_messages(vec![
            ValidationMessage::warning("generated")
                .with_file("lib/src/model.g.dart")
                .with_fix(FixSuggestion::automatic("format").with_command("dart format lib/src/model.g.dart")),
            ValidationMessage::warning("unfixable but excluded")
                .with_file("lib/src/other.g.dart")
                .with_fix(FixSuggestion::manual("look")),
        ]);

        let run = manager.fix(&result).await;
        assert_eq!(run.count(FixResultType::Skipped), 2);
        assert!(run.results().all(|r| r.message.contains("*.g.dart")));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_launch_error_is_failed_not_propagated() {
        let executor = Arc::new(MockExecutor::new().with_default(MockResponse::launch_error("sh: not found")));
        let manager = manager(executor, true);
        let outcome = manager.process_message(&automatic("fix", "whatever")).await;
        assert_eq!(outcome.kind, FixResultType::Failed);
        assert_eq!(outcome.details.as_deref(), Some("sh: not found"));
    }

    #[tokio::test]
    async fn test_commands_run_in_working_directory() {
        let executor = Arc::new(MockExecutor::new());
        let manager = manager(executor.clone(), true);
        manager.process_message(&automatic("fix", "touch x")).await;
        assert_eq!(executor.working_dirs(), vec![PathBuf::from("/pkg")]);
    }

    #[tokio::test]
    async fn test_formatting_strategy() {
        let executor = Arc::new(MockExecutor::new());
        let manager = manager(executor.clone(), true);

        let dart = ValidationMessage::warning("File is not formatted")
            .with_file("lib/a.dart")
            .with_fix(FixSuggestion::automatic("format").with_problem_type(ProblemType::Formatting));
        assert_eq!(manager.process_message(&dart).await.kind, FixResultType::Success);
        assert_eq!(executor.commands(), vec!["dart format lib/a.dart"]);

        let markdown = ValidationMessage::warning("Line too long").with_file("README.md").with_fix(FixSuggestion::automatic("wrap"));
        assert_eq!(manager.process_message(&markdown).await.kind, FixResultType::Unsupported);
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_imports_strategy_from_keywords() {
        let executor = Arc::new(MockExecutor::new());
        let manager = manager(executor.clone(), true);
        let message = ValidationMessage::info("Unused import: 'dart:io'")
            .with_file("lib/a.dart")
            .with_fix(FixSuggestion::automatic("remove it"));
        assert_eq!(manager.process_message(&message).await.kind, FixResultType::Success);
        assert_eq!(executor.commands(), vec!["dart fix --apply lib/a.dart"]);
    }

    #[tokio::test]
    async fn test_configuration_strategy_branches_on_file() {
        let executor = Arc::new(MockExecutor::new());
        let manager = manager(executor.clone(), true);
        let configuration = |file: &str| {
            ValidationMessage::info("configuration drift")
                .with_file(file)
                .with_fix(FixSuggestion::automatic("fix").with_problem_type(ProblemType::Configuration))
        };

        let manifest = manager.process_message(&configuration("pubspec.yaml")).await;
        assert_eq!(manifest.kind, FixResultType::Success);
        assert_eq!(manifest.command.as_deref(), Some("dart pub get"));

        let lints = manager.process_message(&configuration("analysis_options.yaml")).await;
        assert_eq!(lints.kind, FixResultType::Skipped);

        let other = manager.process_message(&configuration("build.yaml")).await;
        assert_eq!(other.kind, FixResultType::Unsupported);

        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_keyword_fallback_ignores_partial_words() {
        let executor = Arc::new(MockExecutor::new());
        let manager = manager(executor.clone(), true);
        let message = ValidationMessage::warning("Important: package information in the manifest is stale")
            .with_file("pubspec.yaml")
            .with_fix(FixSuggestion::automatic("refresh"));

        let outcome = manager.process_message(&message).await;
        assert_eq!(outcome.kind, FixResultType::Success);
        assert_eq!(executor.commands(), vec!["dart pub get"]);
    }

    #[tokio::test]
    async fn test_documentation_and_unknown_problems() {
        let executor = Arc::new(MockExecutor::new());
        let manager = manager(executor.clone(), true);

        let docs = ValidationMessage::info("Missing documentation for a public member")
            .with_fix(FixSuggestion::automatic("document").with_documentation("https://dart.dev/effective-dart/documentation"));
        let outcome = manager.process_message(&docs).await;
        assert_eq!(outcome.kind, FixResultType::Skipped);
        assert!(outcome.details.unwrap().contains("effective-dart"));

        let unknown = ValidationMessage::error("Undefined name 'foo'").with_fix(FixSuggestion::automatic("?"));
        assert_eq!(manager.process_message(&unknown).await.kind, FixResultType::Unsupported);
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_guidance_for_skipped_fixes() {
        let manager = manager(Arc::new(MockExecutor::new()), true);
        let manual = ValidationMessage::error("x")
            .with_fix(FixSuggestion::manual("rename the package").with_documentation("https://dart.dev/tools/pub/pubspec#name"));
        let outcome = manager.process_message(&manual).await;
        assert_eq!(outcome.message, "Manual fix required: rename the package");
        assert_eq!(outcome.details.as_deref(), Some("https://dart.dev/tools/pub/pubspec#name"));

        let suggested = ValidationMessage::warning("y")
            .with_fix(FixSuggestion::suggested("add docs").with_code_example("/// Docs"));
        assert_eq!(manager.process_message(&suggested).await.details.as_deref(), Some("/// Docs"));
    }

    #[tokio::test]
    async fn test_statistics_accumulate_until_reset() {
        let mut manager = manager(failing_third(), true);
        manager.fix(&scenario()).await;
        manager.fix(&scenario()).await;
        assert_eq!(manager.statistics().total_issues, 10);
        assert_eq!(manager.statistics().success_count, 4);

        manager.reset_statistics();
        assert_eq!(*manager.statistics(), FixStatistics::default());

        let run = manager.fix(&scenario()).await;
        assert_eq!(*manager.statistics(), run.statistics);
    }
}
