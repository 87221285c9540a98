//! Quality validator: static analysis through an external analyzer.
//!
//! Runs the configured analyzer in the package directory, parses its
//! diagnostics (machine `A|B|C` lines or the human `info - file:l:c - msg -
//! code` form) and maps each one to a message with a fix hint. An optional
//! format check reports every file the formatter would change.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::findings::Findings;
use super::traits::{Validator, ValidatorKind};
use crate::config::{RulesConfig, Toolchain};
use crate::diagnostic::{FixSuggestion, ProblemType, Severity, ValidationLevel, ValidationMessage, ValidationResult};
use crate::error::Result;
use crate::process::{ProcessExecutor, render_command};
use crate::tree::relative_to;

const NAME: &str = "quality";

/// Diagnostic codes whose fix is import cleanup
const IMPORT_CODES: &[&str] = &["unused_import", "unnecessary_import", "duplicate_import", "directives_ordering"];

/// Diagnostic codes the formatter resolves
const FORMAT_CODES: &[&str] = &["lines_longer_than_80_chars", "eol_at_end_of_file"];

/// Lints with a `dart fix` correction
const DART_FIX_CODES: &[&str] = &[
    "annotate_overrides",
    "prefer_const_constructors",
    "prefer_const_constructors_in_immutables",
    "prefer_const_declarations",
    "prefer_final_fields",
    "prefer_final_locals",
    "prefer_single_quotes",
    "require_trailing_commas",
    "sort_child_properties_last",
    "unnecessary_const",
    "unnecessary_new",
    "unnecessary_this",
    "use_super_parameters",
];

const DOC_CODES: &[&str] = &["public_member_api_docs", "package_api_docs", "slash_for_doc_comments", "comment_references"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerSeverity {
    Error,
    Warning,
    Info,
}

impl AnalyzerSeverity {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Some(AnalyzerSeverity::Error),
            "warning" => Some(AnalyzerSeverity::Warning),
            "info" | "hint" | "lint" => Some(AnalyzerSeverity::Info),
            _ => None,
        }
    }
}

/// One diagnostic reported by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerDiagnostic {
    pub severity: AnalyzerSeverity,
    /// Diagnostic type, e.g. `LINT`, `HINT`, `COMPILE_TIME_ERROR`
    pub kind: String,
    /// Lowercase diagnostic code
    pub code: String,
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl AnalyzerDiagnostic {
    pub fn is_lint(&self) -> bool {
        self.kind.eq_ignore_ascii_case("lint")
    }

    fn documentation_url(&self) -> String {
        if self.is_lint() {
            format!("https://dart.dev/tools/linter-rules/{}", self.code)
        } else {
            format!("https://dart.dev/tools/diagnostic-messages#{}", self.code)
        }
    }
}

/// `SEVERITY|TYPE|CODE|FILE|LINE|COLUMN|LENGTH|MESSAGE`
fn parse_machine_line(line: &str) -> Option<AnalyzerDiagnostic> {
    let fields: Vec<&str> = line.splitn(8, '|').collect();
    if fields.len() != 8 {
        return None;
    }
    Some(AnalyzerDiagnostic {
        severity: AnalyzerSeverity::parse(fields[0])?,
        kind: fields[1].trim().to_string(),
        code: fields[2].trim().to_ascii_lowercase(),
        file: PathBuf::from(fields[3].trim()),
        line: fields[4].trim().parse().ok()?,
        column: fields[5].trim().parse().ok()?,
        message: fields[7].trim().to_string(),
    })
}

/// `  info - lib/a.dart:3:8 - Unused import. - unused_import`
fn parse_human_line(line: &str) -> Option<AnalyzerDiagnostic> {
    let (severity, rest) = line.trim().split_once(" - ")?;
    let severity = AnalyzerSeverity::parse(severity)?;
    let (rest, code) = rest.rsplit_once(" - ")?;
    let (location, message) = rest.split_once(" - ")?;

    let mut parts = location.rsplitn(3, ':');
    let column = parts.next()?.trim().parse().ok()?;
    let line_no = parts.next()?.trim().parse().ok()?;
    let file = parts.next()?.trim();

    let code = code.trim();
    if code.is_empty() || code.contains(char::is_whitespace) {
        return None;
    }

    Some(AnalyzerDiagnostic {
        severity,
        kind: String::new(),
        code: code.to_ascii_lowercase(),
        file: PathBuf::from(file),
        line: line_no,
        column,
        message: message.trim().to_string(),
    })
}

/// Parse every diagnostic line in analyzer output, ignoring anything else.
pub fn parse_analyzer_output(output: &str) -> Vec<AnalyzerDiagnostic> {
    output
        .lines()
        .filter_map(|line| parse_machine_line(line).or_else(|| parse_human_line(line)))
        .collect()
}

/// Files listed as `Changed <path>` by a formatter check run.
pub fn parse_format_check_output(output: &str) -> Vec<PathBuf> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Changed "))
        .map(|path| PathBuf::from(path.trim()))
        .collect()
}

/// Runs the analyzer and the formatter check.
pub struct QualityValidator {
    executor: Arc<dyn ProcessExecutor>,
    toolchain: Toolchain,
    rules: RulesConfig,
}

impl QualityValidator {
    pub fn new(executor: Arc<dyn ProcessExecutor>, toolchain: Toolchain, rules: RulesConfig) -> Self {
        Self {
            executor,
            toolchain,
            rules,
        }
    }

    fn fix_for(&self, diagnostic: &AnalyzerDiagnostic, file: &Path) -> FixSuggestion {
        let code = diagnostic.code.as_str();
        let docs = diagnostic.documentation_url();

        if IMPORT_CODES.contains(&code) {
            FixSuggestion::automatic("Remove unused imports and sort import directives")
                .with_problem_type(ProblemType::Imports)
                .with_documentation(docs)
        } else if FORMAT_CODES.contains(&code) {
            FixSuggestion::automatic("Run the formatter on the file")
                .with_problem_type(ProblemType::Formatting)
                .with_documentation(docs)
        } else if DART_FIX_CODES.contains(&code) {
            FixSuggestion::automatic(format!("Apply the automated fix for '{}'", code))
                .with_command(render_command(&self.toolchain.fix_code_command, Some(file), &[("code", code)]))
                .with_documentation(docs)
        } else if DOC_CODES.contains(&code) {
            FixSuggestion::suggested("Document the public API")
                .with_code_example("/// Describes what this member does.\n")
                .with_problem_type(ProblemType::Documentation)
                .with_documentation(docs)
        } else if diagnostic.severity == AnalyzerSeverity::Error {
            FixSuggestion::manual(diagnostic.message.clone()).with_documentation(docs)
        } else {
            FixSuggestion::suggested(format!("Resolve '{}'", code)).with_documentation(docs)
        }
    }

    fn report_diagnostics(&self, target: &Path, diagnostics: &[AnalyzerDiagnostic], findings: &mut Findings) {
        let canonical = target.canonicalize().unwrap_or_else(|_| target.to_path_buf());

        for diagnostic in diagnostics {
            let file = relative_to(&relative_to(&diagnostic.file, &canonical), target);
            let message = ValidationMessage::new(Severity::Info, format!("{} ({})", diagnostic.message, diagnostic.code))
                .with_file(&file)
                .at_line(diagnostic.line)
                .with_rule(format!("quality.{}", diagnostic.code))
                .with_fix(self.fix_for(diagnostic, &file));

            match diagnostic.severity {
                AnalyzerSeverity::Error => findings.push(ValidationMessage {
                    severity: Severity::Error,
                    ..message
                }),
                AnalyzerSeverity::Warning => findings.advise(message),
                AnalyzerSeverity::Info => findings.push(message),
            }
        }

        let infos = diagnostics.iter().filter(|d| d.severity == AnalyzerSeverity::Info).count();
        if findings.level().is_enterprise() && infos > self.rules.enterprise_max_analyzer_infos {
            findings.push(
                ValidationMessage::error(format!(
                    "{} analyzer infos exceed the enterprise budget of {}",
                    infos, self.rules.enterprise_max_analyzer_infos
                ))
                .with_rule("quality.info_budget")
                .with_fix(FixSuggestion::manual("Resolve analyzer infos or tighten the lint configuration")),
            );
        }
    }

    /// Returns false when the analyzer could not produce usable output.
    async fn run_analyzer(&self, target: &Path, findings: &mut Findings) -> bool {
        let command = &self.toolchain.analyze_command;
        let output = match self.executor.run(command, target).await {
            Ok(output) => output,
            Err(e) => {
                findings.push(
                    ValidationMessage::error(format!("Static analysis tool could not run: {}", e))
                        .with_rule("quality.tool_unavailable")
                        .with_fix(
                            FixSuggestion::manual(format!("Make sure `{}` can be run from the package directory", command))
                                .with_documentation("https://dart.dev/get-dart"),
                        ),
                );
                return false;
            }
        };

        let diagnostics = parse_analyzer_output(&output.combined());
        if diagnostics.is_empty() && !output.success() {
            let stderr = output.stderr.trim();
            findings.push(
                ValidationMessage::error(format!(
                    "Static analysis failed with exit code {}{}",
                    output.exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()),
                    if stderr.is_empty() { String::new() } else { format!(": {}", stderr) }
                ))
                .with_rule("quality.tool_failed")
                .with_fix(FixSuggestion::manual(format!("Run `{}` by hand and resolve its failure", command))),
            );
            return false;
        }

        tracing::debug!(diagnostics = diagnostics.len(), exit_code = ?output.exit_code, "Analyzer finished");
        self.report_diagnostics(target, &diagnostics, findings);
        true
    }

    async fn run_format_check(&self, target: &Path, command: &str, findings: &mut Findings) {
        let output = match self.executor.run(command, target).await {
            Ok(output) => output,
            Err(e) => {
                findings.push(
                    ValidationMessage::error(format!("Format check could not run: {}", e))
                        .with_rule("quality.format_tool_unavailable"),
                );
                return;
            }
        };

        let changed = parse_format_check_output(&output.combined());
        if changed.is_empty() && !output.success() {
            findings.push(
                ValidationMessage::error(format!(
                    "Format check failed with exit code {}: {}",
                    output.exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()),
                    output.stderr.trim()
                ))
                .with_rule("quality.format_tool_failed"),
            );
            return;
        }

        for file in changed {
            let file = relative_to(&file, target);
            findings.advise(
                ValidationMessage::warning("File is not formatted")
                    .with_file(&file)
                    .with_rule("quality.unformatted")
                    .with_fix(
                        FixSuggestion::automatic("Run the formatter on the file")
                            .with_problem_type(ProblemType::Formatting)
                            .with_documentation("https://dart.dev/tools/dart-format"),
                    ),
            );
        }
    }
}

#[async_trait]
impl Validator for QualityValidator {
    async fn validate(&self, target: &Path, level: ValidationLevel) -> Result<ValidationResult> {
        let mut findings = Findings::new(NAME, level);

        let analyzed = self.run_analyzer(target, &mut findings).await;
        if analyzed && let Some(command) = &self.toolchain.format_check_command {
            self.run_format_check(target, command, &mut findings).await;
        }

        Ok(findings.finish("Static analysis found no issues"))
    }

    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Quality
    }

    fn min_level(&self) -> ValidationLevel {
        ValidationLevel::Standard
    }
}
