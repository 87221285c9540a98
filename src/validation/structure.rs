//! Structure validator: presence and shape of the package layout.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::findings::Findings;
use super::manifest::{Manifest, ManifestState};
use super::traits::{Validator, ValidatorKind};
use crate::config::{LayoutConfig, RulesConfig, Toolchain};
use crate::diagnostic::{FixSuggestion, ProblemType, Severity, ValidationLevel, ValidationMessage, ValidationResult};
use crate::error::Result;
use crate::process::{Shell, mkdir_command};
use crate::tree;

const NAME: &str = "structure";
const LAYOUT_DOCS: &str = "https://dart.dev/tools/pub/package-layout";

/// Checks required and recommended files and directories, file naming, and
/// (at enterprise level) test coverage of the library.
pub struct StructureValidator {
    layout: LayoutConfig,
    toolchain: Toolchain,
    rules: RulesConfig,
}

impl StructureValidator {
    pub fn new(layout: LayoutConfig, toolchain: Toolchain, rules: RulesConfig) -> Self {
        Self {
            layout,
            toolchain,
            rules,
        }
    }

    fn check_required(&self, target: &Path, findings: &mut Findings) {
        for dir in &self.layout.required_dirs {
            if !target.join(dir).is_dir() {
                findings.push(
                    ValidationMessage::error(format!("Required directory '{}' is missing", dir))
                        .with_file(dir)
                        .with_rule("structure.missing_directory")
                        .with_fix(
                            FixSuggestion::automatic(format!("Create the '{}' directory", dir))
                                .with_command(mkdir_command(dir, Shell::native()))
                                .with_documentation(LAYOUT_DOCS),
                        ),
                );
            }
        }

        for file in &self.layout.required_files {
            if !target.join(file).is_file() {
                let mut fix = FixSuggestion::manual(format!("Create '{}'", file)).with_documentation(LAYOUT_DOCS);
                if file == &self.toolchain.manifest_file {
                    fix = fix
                        .with_code_example("name: my_package\nversion: 0.1.0\nenvironment:\n  sdk: ^3.0.0\n")
                        .with_problem_type(ProblemType::Configuration);
                }
                findings.push(
                    ValidationMessage::error(format!("Required file '{}' is missing", file))
                        .with_file(file)
                        .with_rule("structure.missing_file")
                        .with_fix(fix),
                );
            }
        }
    }

    fn check_main_library(&self, target: &Path, findings: &mut Findings) {
        let ManifestState::Loaded(manifest) = Manifest::load(target, &self.toolchain.manifest_file) else {
            return;
        };
        let Some(name) = manifest.name() else {
            return;
        };
        let Some(ext) = self.toolchain.source_extensions.first() else {
            return;
        };
        let main = PathBuf::from("lib").join(format!("{}.{}", name, ext));
        if target.join("lib").is_dir() && !target.join(&main).is_file() {
            findings.advise(
                ValidationMessage::warning(format!(
                    "Main library file '{}' is missing; the package cannot be imported as 'package:{}/{}.{}'",
                    main.display(),
                    name,
                    name,
                    ext
                ))
                .with_file(&main)
                .with_rule("structure.missing_main_library")
                .with_fix(
                    FixSuggestion::manual("Add a library file that exports the public API")
                        .with_code_example(format!("export 'src/{}_base.{}';\n", name, ext))
                        .with_documentation(LAYOUT_DOCS),
                ),
            );
        }
    }

    fn check_recommended(&self, target: &Path, findings: &mut Findings) {
        for dir in &self.layout.recommended_dirs {
            if !target.join(dir).is_dir() {
                findings.advise(
                    ValidationMessage::warning(format!("Recommended directory '{}' is missing", dir))
                        .with_file(dir)
                        .with_rule("structure.missing_recommended_directory")
                        .with_fix(
                            FixSuggestion::suggested(format!("Create '{}' and add content to it", dir))
                                .with_documentation(LAYOUT_DOCS),
                        ),
                );
            }
        }

        for file in &self.layout.recommended_files {
            if target.join(file).is_file() {
                continue;
            }
            let fix = if file == &self.toolchain.lint_config_file {
                FixSuggestion::suggested(format!("Add '{}' enabling a recommended lint set", file))
                    .with_code_example("include: package:lints/recommended.yaml\n")
                    .with_documentation("https://dart.dev/tools/analysis")
                    .with_problem_type(ProblemType::Configuration)
            } else {
                FixSuggestion::manual(format!("Write '{}'", file))
                    .with_documentation(LAYOUT_DOCS)
                    .with_problem_type(ProblemType::Documentation)
            };
            findings.advise(
                ValidationMessage::warning(format!("Recommended file '{}' is missing", file))
                    .with_file(file)
                    .with_rule("structure.missing_recommended_file")
                    .with_fix(fix),
            );
        }
    }

    fn check_sources(&self, files: &[PathBuf], findings: &mut Findings) -> (usize, usize) {
        let sources: Vec<&PathBuf> = files.iter().filter(|f| self.toolchain.is_source_file(f)).collect();

        let lib_files: Vec<&PathBuf> = sources.iter().copied().filter(|f| f.starts_with("lib")).collect();
        let test_files: Vec<&PathBuf> = sources.iter().copied().filter(|f| is_test_file(f)).collect();

        let lib_root_files = lib_files.iter().filter(|f| f.parent() == Some(Path::new("lib"))).count();
        let has_src = lib_files.iter().any(|f| f.starts_with("lib/src"));
        if lib_root_files > 1 && !has_src {
            findings.push(
                ValidationMessage::info(format!(
                    "{} library files live directly in 'lib'; implementation files belong in 'lib/src'",
                    lib_root_files
                ))
                .with_file("lib")
                .with_rule("structure.lib_src_convention")
                .with_fix(
                    FixSuggestion::suggested("Move private implementation files under lib/src and export them")
                        .with_documentation(LAYOUT_DOCS),
                ),
            );
        }

        for file in &sources {
            if !is_snake_case_file(file) {
                findings.advise(
                    ValidationMessage::warning(format!(
                        "File name '{}' is not lowercase_with_underscores",
                        file.file_name().and_then(|n| n.to_str()).unwrap_or_default()
                    ))
                    .with_file(file)
                    .with_rule("structure.file_naming")
                    .with_fix(
                        FixSuggestion::manual("Rename the file and update its imports")
                            .with_documentation("https://dart.dev/tools/linter-rules/file_names"),
                    ),
                );
            }
        }

        let has_test_dir = files.iter().any(|f| f.starts_with("test"));
        if has_test_dir && test_files.is_empty() {
            findings.advise(
                ValidationMessage::warning("The 'test' directory contains no *_test files")
                    .with_file("test")
                    .with_rule("structure.no_tests")
                    .with_fix(
                        FixSuggestion::manual("Add tests for the public API")
                            .with_documentation("https://dart.dev/guides/testing"),
                    ),
            );
        }

        (lib_files.len(), test_files.len())
    }

    fn check_enterprise(&self, target: &Path, lib_count: usize, test_count: usize, findings: &mut Findings) {
        for dir in &self.layout.enterprise_dirs {
            if !target.join(dir).is_dir() {
                findings.push(
                    ValidationMessage::error(format!("Directory '{}' is required at enterprise level", dir))
                        .with_file(dir)
                        .with_rule("structure.enterprise_directory")
                        .with_fix(FixSuggestion::manual(format!("Add a runnable '{}'", dir)).with_documentation(LAYOUT_DOCS)),
                );
            }
        }

        if lib_count == 0 {
            return;
        }
        let ratio = test_count as f64 / lib_count as f64;
        if ratio < self.rules.enterprise_min_test_ratio {
            findings.push(
                ValidationMessage::error(format!(
                    "Test coverage below threshold: {} test files for {} library files (ratio {:.2}, required {:.2})",
                    test_count, lib_count, ratio, self.rules.enterprise_min_test_ratio
                ))
                .with_file("test")
                .with_rule("structure.test_ratio")
                .with_fix(FixSuggestion::manual("Add tests until the ratio is met")),
            );
        }
    }
}

impl Default for StructureValidator {
    fn default() -> Self {
        Self::new(LayoutConfig::default(), Toolchain::default(), RulesConfig::default())
    }
}

fn is_test_file(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem.ends_with("_test"))
}

fn is_snake_case_file(path: &Path) -> bool {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    stem.split('.').all(|part| {
        !part.is_empty()
            && !part.starts_with(|c: char| c.is_ascii_digit())
            && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    })
}

#[async_trait]
impl Validator for StructureValidator {
    async fn validate(&self, target: &Path, level: ValidationLevel) -> Result<ValidationResult> {
        let mut findings = Findings::new(NAME, level);

        if !target.is_dir() {
            findings.push(
                ValidationMessage::error(format!("Target path '{}' does not exist or is not a directory", target.display()))
                    .with_rule("structure.target_missing")
                    .with_fix(FixSuggestion::unfixable("Point the validation at a generated package directory")),
            );
            return Ok(findings.finish(""));
        }

        self.check_required(target, &mut findings);

        if level.includes_advisory_rules() {
            self.check_main_library(target, &mut findings);
            self.check_recommended(target, &mut findings);

            let listing = tree::walk(target, &self.layout.ignored_dirs)?;
            for (path, reason) in &listing.unreadable {
                findings.push(
                    ValidationMessage::warning(format!("'{}' could not be read and was not inspected: {}", path.display(), reason))
                        .with_file(path)
                        .with_rule("structure.unreadable_path")
                        .with_fix(FixSuggestion::manual("Make the path readable and validate again")),
                );
            }
            let (lib_count, test_count) = self.check_sources(&listing.files, &mut findings);

            if level.is_enterprise() {
                self.check_enterprise(target, lib_count, test_count, &mut findings);
            }
        }

        log::debug!("structure: {} errors in {}", findings.count(Severity::Error), target.display());
        Ok(findings.finish("Package structure matches the expected layout"))
    }

    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Structure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::FixabilityLevel;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn complete_package() -> TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for d in ["lib/src", "test", "example"] {
            fs::create_dir_all(root.join(d)).unwrap();
        }
        fs::write(root.join("pubspec.yaml"), "name: widget_kit\nversion: 1.0.0\n").unwrap();
        for f in ["README.md", "CHANGELOG.md", "LICENSE", "analysis_options.yaml"] {
            fs::write(root.join(f), "x").unwrap();
        }
        fs::write(root.join("lib/widget_kit.dart"), "export 'src/widget_kit_base.dart';").unwrap();
        fs::write(root.join("lib/src/widget_kit_base.dart"), "class Widget {}").unwrap();
        fs::write(root.join("test/widget_kit_test.dart"), "void main() {}").unwrap();
        fs::write(root.join("example/main.dart"), "void main() {}").unwrap();
        dir
    }

    async fn run(target: &Path, level: ValidationLevel) -> ValidationResult {
        StructureValidator::default().validate(target, level).await.unwrap()
    }

    fn rules(result: &ValidationResult) -> Vec<&str> {
        result.iter().filter_map(|m| m.rule.as_deref()).collect()
    }

    #[tokio::test]
    async fn test_complete_package_passes_every_level() {
        let pkg = complete_package();
        for level in ValidationLevel::ALL {
            let result = run(pkg.path(), level).await;
            assert!(!result.iter().any(|m| m.severity.is_problem()), "{:?}: {:?}", level, result);
            assert_eq!(result.successes().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_missing_target() {
        let result = run(Path::new("/nonexistent/modgate/pkg"), ValidationLevel::Basic).await;
        assert_eq!(rules(&result), vec!["structure.target_missing"]);
        assert!(result.has_errors());
        assert!(result.autofixable_messages().is_empty());
    }

    #[tokio::test]
    async fn test_missing_lib_is_automatic_fix() {
        let pkg = complete_package();
        fs::remove_dir_all(pkg.path().join("lib")).unwrap();

        let result = run(pkg.path(), ValidationLevel::Basic).await;
        let msg = result.errors()[0];
        assert_eq!(msg.rule.as_deref(), Some("structure.missing_directory"));
        let fix = msg.fix_suggestion.as_ref().unwrap();
        assert_eq!(fix.fixability, FixabilityLevel::Automatic);
        assert_eq!(fix.command, Some(mkdir_command("lib", Shell::native())));
    }

    #[tokio::test]
    async fn test_missing_manifest_is_manual() {
        let pkg = complete_package();
        fs::remove_file(pkg.path().join("pubspec.yaml")).unwrap();

        let result = run(pkg.path(), ValidationLevel::Basic).await;
        let msg = result.errors()[0];
        assert_eq!(msg.rule.as_deref(), Some("structure.missing_file"));
        assert_eq!(msg.fix_suggestion.as_ref().unwrap().fixability, FixabilityLevel::Manual);
    }

    #[tokio::test]
    async fn test_basic_ignores_recommended_files() {
        let pkg = complete_package();
        fs::remove_file(pkg.path().join("CHANGELOG.md")).unwrap();

        let basic = run(pkg.path(), ValidationLevel::Basic).await;
        assert!(basic.is_success());
        assert!(basic.warnings().is_empty());

        let standard = run(pkg.path(), ValidationLevel::Standard).await;
        assert_eq!(standard.warnings().len(), 1);
        assert!(standard.is_success());

        let strict = run(pkg.path(), ValidationLevel::Strict).await;
        assert_eq!(strict.errors().len(), 1);
        assert_eq!(strict.errors()[0].rule.as_deref(), Some("structure.missing_recommended_file"));
    }

    #[tokio::test]
    async fn test_missing_lint_config_is_suggested_configuration() {
        let pkg = complete_package();
        fs::remove_file(pkg.path().join("analysis_options.yaml")).unwrap();

        let result = run(pkg.path(), ValidationLevel::Standard).await;
        let fix = result.warnings()[0].fix_suggestion.clone().unwrap();
        assert_eq!(fix.fixability, FixabilityLevel::Suggested);
        assert_eq!(fix.problem_type, Some(ProblemType::Configuration));
        assert!(fix.code_example.unwrap().contains("lints"));
    }

    #[tokio::test]
    async fn test_missing_main_library() {
        let pkg = complete_package();
        fs::remove_file(pkg.path().join("lib/widget_kit.dart")).unwrap();

        let result = run(pkg.path(), ValidationLevel::Standard).await;
        assert!(rules(&result).contains(&"structure.missing_main_library"));
    }

    #[tokio::test]
    async fn test_file_naming() {
        let pkg = complete_package();
        fs::write(pkg.path().join("lib/src/WidgetHelper.dart"), "").unwrap();

        let result = run(pkg.path(), ValidationLevel::Standard).await;
        let naming: Vec<_> = result
            .iter()
            .filter(|m| m.rule.as_deref() == Some("structure.file_naming"))
            .collect();
        assert_eq!(naming.len(), 1);
        assert_eq!(naming[0].file.as_deref(), Some(Path::new("lib/src/WidgetHelper.dart")));
    }

    #[tokio::test]
    async fn test_empty_test_directory() {
        let pkg = complete_package();
        fs::remove_file(pkg.path().join("test/widget_kit_test.dart")).unwrap();
        fs::write(pkg.path().join("test/helpers.dart"), "").unwrap();

        let result = run(pkg.path(), ValidationLevel::Standard).await;
        assert!(rules(&result).contains(&"structure.no_tests"));
    }

    #[tokio::test]
    async fn test_lib_src_convention_is_info() {
        let pkg = complete_package();
        fs::remove_dir_all(pkg.path().join("lib/src")).unwrap();
        fs::write(pkg.path().join("lib/widget_kit.dart"), "").unwrap();
        fs::write(pkg.path().join("lib/extra.dart"), "").unwrap();

        let result = run(pkg.path(), ValidationLevel::Standard).await;
        let info = result.infos();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].rule.as_deref(), Some("structure.lib_src_convention"));
    }

    #[tokio::test]
    async fn test_enterprise_thresholds() {
        let pkg = complete_package();
        fs::remove_dir_all(pkg.path().join("example")).unwrap();
        for i in 0..4 {
            fs::write(pkg.path().join(format!("lib/src/part_{}.dart", i)), "").unwrap();
        }

        let strict = run(pkg.path(), ValidationLevel::Strict).await;
        assert!(strict.is_success());

        let enterprise = run(pkg.path(), ValidationLevel::Enterprise).await;
        let found = rules(&enterprise);
        assert!(found.contains(&"structure.enterprise_directory"));
        assert!(found.contains(&"structure.test_ratio"));
        assert_eq!(enterprise.count(Severity::Error), 2);
    }

    #[tokio::test]
    async fn test_ignored_directories_are_not_walked() {
        let pkg = complete_package();
        fs::create_dir_all(pkg.path().join(".dart_tool/build")).unwrap();
        fs::write(pkg.path().join(".dart_tool/build/Generated.dart"), "").unwrap();

        let result = run(pkg.path(), ValidationLevel::Standard).await;
        assert!(result.is_success());
        assert!(result.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_nested_required_directory_command() {
        let pkg = complete_package();
        let layout = LayoutConfig {
            required_dirs: vec!["lib".to_string(), "assets/my icons".to_string()],
            ..LayoutConfig::default()
        };
        let validator = StructureValidator::new(layout, Toolchain::default(), RulesConfig::default());

        let result = validator.validate(pkg.path(), ValidationLevel::Basic).await.unwrap();
        let fix = result.errors()[0].fix_suggestion.as_ref().unwrap();
        assert_eq!(fix.command, Some(mkdir_command("assets/my icons", Shell::native())));
        if cfg!(unix) {
            assert_eq!(fix.command.as_deref(), Some("mkdir -p 'assets/my icons'"));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_directory_keeps_other_findings() {
        use std::os::unix::fs::PermissionsExt;

        let pkg = complete_package();
        fs::write(pkg.path().join("lib/src/BadName.dart"), "").unwrap();
        let locked = pkg.path().join("lib/private");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let readable = fs::read_dir(&locked).is_ok();
        let result = StructureValidator::default().validate(pkg.path(), ValidationLevel::Standard).await;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let result = result.unwrap();
        let found = rules(&result);
        assert!(found.contains(&"structure.file_naming"));
        assert!(!found.contains(&"orchestrator.validator_failed"));
        if !readable {
            let unreadable = result
                .iter()
                .find(|m| m.rule.as_deref() == Some("structure.unreadable_path"))
                .unwrap();
            assert_eq!(unreadable.severity, Severity::Warning);
            assert_eq!(unreadable.file.as_deref(), Some(Path::new("lib/private")));
        }
    }

    #[tokio::test]
    async fn test_validator_does_not_modify_tree() {
        let pkg = complete_package();
        fs::remove_dir_all(pkg.path().join("lib")).unwrap();
        let before = tree::walk(pkg.path(), &[]).unwrap();

        run(pkg.path(), ValidationLevel::Enterprise).await;

        assert_eq!(tree::walk(pkg.path(), &[]).unwrap(), before);
        assert!(!pkg.path().join("lib").exists());
    }

    #[test]
    fn test_snake_case_names() {
        assert!(is_snake_case_file(Path::new("lib/widget_kit.dart")));
        assert!(is_snake_case_file(Path::new("lib/model.g.dart")));
        assert!(is_snake_case_file(Path::new("lib/v2_api.dart")));
        assert!(!is_snake_case_file(Path::new("lib/WidgetKit.dart")));
        assert!(!is_snake_case_file(Path::new("lib/widget-kit.dart")));
        assert!(!is_snake_case_file(Path::new("lib/2fa.dart")));
    }
}
