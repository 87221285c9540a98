use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::diagnostic::ValidationLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub validation: ValidationConfig,
    pub cache: CacheConfig,
    pub autofix: AutoFixConfig,
    pub toolchain: Toolchain,
    pub layout: LayoutConfig,
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub level: String,
    pub parallel: bool,
    pub max_parallel: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            level: "standard".to_string(),
            parallel: true,
            max_parallel: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub ttl_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("modgate")
                .join("results"),
            ttl_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoFixConfig {
    pub continue_on_error: bool,
    pub exclude_patterns: Vec<String>,
    /// Timeout for a single fix command
    pub command_timeout_ms: u64,
}

impl Default for AutoFixConfig {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            exclude_patterns: vec!["*.g.dart".to_string(), "*.freezed.dart".to_string()],
            command_timeout_ms: 120_000,
        }
    }
}

/// External commands and file names of the package ecosystem being checked.
///
/// Commands are run through the platform shell in the target directory. A
/// `{file}` placeholder is replaced with the quoted file of the message being
/// fixed, or `.` when it has none.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Toolchain {
    pub analyze_command: String,
    pub format_check_command: Option<String>,
    pub format_command: String,
    pub imports_command: String,
    /// Applies the automated fix for one diagnostic code (`{code}`, `{file}`)
    pub fix_code_command: String,
    pub dependency_command: String,
    pub source_extensions: Vec<String>,
    pub manifest_file: String,
    pub lockfile: String,
    pub lint_config_file: String,
    pub timeout_ms: u64,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            analyze_command: "dart analyze --format=machine .".to_string(),
            format_check_command: Some("dart format --output=none --set-exit-if-changed .".to_string()),
            format_command: "dart format {file}".to_string(),
            imports_command: "dart fix --apply {file}".to_string(),
            fix_code_command: "dart fix --apply --code={code} {file}".to_string(),
            dependency_command: "dart pub get".to_string(),
            source_extensions: vec!["dart".to_string()],
            manifest_file: "pubspec.yaml".to_string(),
            lockfile: "pubspec.lock".to_string(),
            lint_config_file: "analysis_options.yaml".to_string(),
            timeout_ms: 300_000,
        }
    }
}

impl Toolchain {
    /// Whether `path` has one of the configured source extensions
    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.source_extensions.iter().any(|s| s.eq_ignore_ascii_case(ext)))
    }

    pub fn is_manifest(&self, path: &Path) -> bool {
        file_name_is(path, &self.manifest_file)
    }

    pub fn is_lint_config(&self, path: &Path) -> bool {
        file_name_is(path, &self.lint_config_file)
    }
}

fn file_name_is(path: &Path, name: &str) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(name)
}

/// Expected shape of a package tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub required_dirs: Vec<String>,
    pub required_files: Vec<String>,
    pub recommended_dirs: Vec<String>,
    pub recommended_files: Vec<String>,
    pub enterprise_dirs: Vec<String>,
    /// Directories never walked (tool output, VCS metadata)
    pub ignored_dirs: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            required_dirs: vec!["lib".to_string()],
            required_files: vec!["pubspec.yaml".to_string()],
            recommended_dirs: vec!["test".to_string()],
            recommended_files: vec![
                "README.md".to_string(),
                "CHANGELOG.md".to_string(),
                "LICENSE".to_string(),
                "analysis_options.yaml".to_string(),
            ],
            enterprise_dirs: vec!["example".to_string()],
            ignored_dirs: vec![
                ".git".to_string(),
                ".dart_tool".to_string(),
                "build".to_string(),
                ".idea".to_string(),
                ".modgate".to_string(),
            ],
        }
    }
}

/// A dependency version known to be insecure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub package: String,
    /// First version that is no longer affected
    pub fixed_in: String,
    pub summary: String,
}

/// Thresholds for the higher validation levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Test files per library file required at enterprise level
    pub enterprise_min_test_ratio: f64,
    /// Analyzer info diagnostics tolerated at enterprise level
    pub enterprise_max_analyzer_infos: usize,
    /// Direct dependencies tolerated at enterprise level
    pub enterprise_max_dependencies: usize,
    pub description_min_len: usize,
    pub description_max_len: usize,
    pub lint_packages: Vec<String>,
    pub advisories: Vec<Advisory>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            enterprise_min_test_ratio: 0.5,
            enterprise_max_analyzer_infos: 25,
            enterprise_max_dependencies: 30,
            description_min_len: 60,
            description_max_len: 180,
            lint_packages: vec![
                "lints".to_string(),
                "flutter_lints".to_string(),
                "very_good_analysis".to_string(),
            ],
            advisories: vec![Advisory {
                package: "http".to_string(),
                fixed_in: "0.13.3".to_string(),
                summary: "CRLF injection through unsanitized request method".to_string(),
            }],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            validation: ValidationConfig::default(),
            cache: CacheConfig::default(),
            autofix: AutoFixConfig::default(),
            toolchain: Toolchain::default(),
            layout: LayoutConfig::default(),
            rules: RulesConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Configured level; an unknown value falls back to `standard`
    pub fn level(&self) -> ValidationLevel {
        self.validation.level.parse().unwrap_or_else(|e| {
            log::warn!("{}; falling back to standard", e);
            ValidationLevel::Standard
        })
    }
}
