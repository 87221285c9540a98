//! Platform compliance validator: packaging metadata and plugin platform
//! declarations.

use async_trait::async_trait;
use serde_yaml::{Mapping, Value};
use std::path::Path;

use super::constraint::Version;
use super::findings::Findings;
use super::manifest::{Manifest, ManifestState};
use super::traits::{Validator, ValidatorKind};
use crate::config::{RulesConfig, Toolchain};
use crate::diagnostic::{FixSuggestion, ProblemType, ValidationLevel, ValidationMessage, ValidationResult};
use crate::error::Result;

const NAME: &str = "platform";
const PUBSPEC_DOCS: &str = "https://dart.dev/tools/pub/pubspec";
const PLUGIN_DOCS: &str = "https://docs.flutter.dev/packages-and-plugins/developing-packages#plugin-platforms";

pub const KNOWN_PLATFORMS: &[&str] = &["android", "ios", "linux", "macos", "windows", "web"];

const MAX_TOPICS: usize = 5;

const RESERVED_WORDS: &[&str] = &[
    "abstract", "as", "assert", "async", "await", "break", "case", "catch", "class", "const", "continue", "covariant",
    "default", "deferred", "do", "dynamic", "else", "enum", "export", "extends", "extension", "external", "factory",
    "false", "final", "finally", "for", "function", "get", "hide", "if", "implements", "import", "in", "interface",
    "is", "late", "library", "mixin", "new", "null", "on", "operator", "part", "required", "rethrow", "return", "set",
    "show", "static", "super", "switch", "sync", "this", "throw", "true", "try", "typedef", "var", "void", "while",
    "with", "yield",
];

/// Lowercase identifier with underscores that is not a reserved word
pub fn is_valid_package_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !RESERVED_WORDS.contains(&name)
}

/// 2-32 characters of lowercase letters, digits and dashes, starting with a
/// letter and not ending with a dash
pub fn is_valid_topic(topic: &str) -> bool {
    (2..=32).contains(&topic.len())
        && topic.starts_with(|c: char| c.is_ascii_lowercase())
        && !topic.ends_with('-')
        && !topic.contains("--")
        && topic.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn has_key(map: &Mapping, key: &str) -> bool {
    map.get(key).is_some_and(|v| !v.is_null())
}

/// Checks manifest metadata required for publishing and the platform
/// capabilities a plugin declares.
pub struct PlatformComplianceValidator {
    toolchain: Toolchain,
    rules: RulesConfig,
}

impl PlatformComplianceValidator {
    pub fn new(toolchain: Toolchain, rules: RulesConfig) -> Self {
        Self { toolchain, rules }
    }

    fn at_key(&self, manifest: &Manifest, key: &str, message: ValidationMessage) -> ValidationMessage {
        let message = message.with_file(manifest.path());
        match manifest.line_of(key) {
            Some(line) => message.at_line(line),
            None => message,
        }
    }

    fn missing_field(&self, manifest: &Manifest, field: &str, example: &str) -> ValidationMessage {
        ValidationMessage::error(format!("Required field '{}' is missing", field))
            .with_file(manifest.path())
            .with_rule("platform.missing_field")
            .with_fix(
                FixSuggestion::manual(format!("Add '{}' to the manifest", field))
                    .with_code_example(example)
                    .with_problem_type(ProblemType::Configuration)
                    .with_documentation(PUBSPEC_DOCS),
            )
    }

    fn check_identity(&self, manifest: &Manifest, findings: &mut Findings) {
        match manifest.name() {
            None => findings.push(self.missing_field(manifest, "name", "name: my_package\n")),
            Some(name) if !is_valid_package_name(&name) => findings.push(self.at_key(
                manifest,
                "name",
                ValidationMessage::error(format!(
                    "Package name '{}' must be a lowercase identifier with underscores and not a reserved word",
                    name
                ))
                .with_rule("platform.invalid_name")
                .with_fix(
                    FixSuggestion::manual("Rename the package")
                        .with_code_example(format!("name: {}\n", name.to_ascii_lowercase().replace(['-', ' '], "_")))
                        .with_documentation("https://dart.dev/tools/pub/pubspec#name"),
                ),
            )),
            Some(_) => {}
        }

        match manifest.version() {
            None => findings.push(self.missing_field(manifest, "version", "version: 0.1.0\n")),
            Some(version) => {
                if let Err(e) = version.parse::<Version>() {
                    findings.push(self.at_key(
                        manifest,
                        "version",
                        ValidationMessage::error(format!("Version '{}' is not a semantic version: {}", version, e))
                            .with_rule("platform.invalid_version")
                            .with_fix(
                                FixSuggestion::manual("Use MAJOR.MINOR.PATCH")
                                    .with_code_example("version: 1.0.0\n")
                                    .with_documentation("https://dart.dev/tools/pub/versioning"),
                            ),
                    ));
                }
            }
        }

        if manifest.get("environment").and_then(Value::as_mapping).is_none() {
            findings.push(self.missing_field(manifest, "environment", "environment:\n  sdk: ^3.0.0\n"));
        }
    }

    fn check_metadata(&self, manifest: &Manifest, findings: &mut Findings) {
        let (min, max) = (self.rules.description_min_len, self.rules.description_max_len);
        match manifest.description() {
            None => findings.advise(
                ValidationMessage::warning("Package description is missing")
                    .with_file(manifest.path())
                    .with_rule("platform.missing_description")
                    .with_fix(
                        FixSuggestion::suggested(format!("Describe the package in {} to {} characters", min, max))
                            .with_code_example("description: A short sentence explaining what the package does and who it is for.\n")
                            .with_problem_type(ProblemType::Documentation)
                            .with_documentation("https://dart.dev/tools/pub/pubspec#description"),
                    ),
            ),
            Some(description) => {
                let len = description.trim().chars().count();
                if len < min || len > max {
                    findings.advise(self.at_key(
                        manifest,
                        "description",
                        ValidationMessage::warning(format!(
                            "Package description is {} characters; expected {} to {}",
                            len, min, max
                        ))
                        .with_rule("platform.description_length")
                        .with_fix(
                            FixSuggestion::suggested("Rewrite the description")
                                .with_problem_type(ProblemType::Documentation)
                                .with_documentation("https://dart.dev/tools/pub/pubspec#description"),
                        ),
                    ));
                }
            }
        }

        if manifest.scalar("homepage").is_none() && manifest.scalar("repository").is_none() {
            findings.advise(
                ValidationMessage::warning("Neither 'homepage' nor 'repository' is set")
                    .with_file(manifest.path())
                    .with_rule("platform.missing_homepage")
                    .with_fix(
                        FixSuggestion::suggested("Point users at the source code")
                            .with_code_example("repository: https://github.com/owner/package\n")
                            .with_problem_type(ProblemType::Configuration)
                            .with_documentation(PUBSPEC_DOCS),
                    ),
            );
        }

        if manifest.scalar("publish_to").as_deref() == Some("none") {
            findings.push(self.at_key(
                manifest,
                "publish_to",
                ValidationMessage::info("Package is marked unpublishable (publish_to: none)").with_rule("platform.unpublished"),
            ));
        }
    }

    fn check_declared_platforms(&self, manifest: &Manifest, findings: &mut Findings) {
        let Some(value) = manifest.get("platforms") else {
            return;
        };
        let Some(platforms) = value.as_mapping() else {
            findings.push(self.at_key(
                manifest,
                "platforms",
                ValidationMessage::error("'platforms' must be a mapping of platform names")
                    .with_rule("platform.invalid_platforms")
                    .with_fix(FixSuggestion::manual("List supported platforms as keys").with_code_example("platforms:\n  android:\n  ios:\n")),
            ));
            return;
        };
        for key in platforms.keys() {
            let name = key.as_str().unwrap_or_default();
            if !KNOWN_PLATFORMS.contains(&name) {
                findings.push(self.at_key(
                    manifest,
                    "platforms",
                    ValidationMessage::error(format!("Unknown platform '{}' in 'platforms'", name))
                        .with_rule("platform.unknown_platform")
                        .with_fix(FixSuggestion::manual(format!("Use one of: {}", KNOWN_PLATFORMS.join(", ")))),
                ));
            }
        }
    }

    fn check_plugin(&self, target: &Path, manifest: &Manifest, findings: &mut Findings) {
        let Some(platforms) = manifest.plugin_platforms() else {
            return;
        };
        let line = manifest.line_of_nested("flutter", "platforms");
        let locate = |message: ValidationMessage| {
            let message = message.with_file(manifest.path());
            match line {
                Some(l) => message.at_line(l),
                None => message,
            }
        };

        for (key, spec) in platforms {
            let name = key.as_str().unwrap_or_default();
            if !KNOWN_PLATFORMS.contains(&name) {
                findings.push(locate(
                    ValidationMessage::error(format!("Plugin declares unknown platform '{}'", name))
                        .with_rule("platform.unknown_platform")
                        .with_fix(FixSuggestion::manual(format!("Use one of: {}", KNOWN_PLATFORMS.join(", "))).with_documentation(PLUGIN_DOCS)),
                ));
                continue;
            }

            let empty = Mapping::new();
            let spec = spec.as_mapping().unwrap_or(&empty);
            let native = has_key(spec, "pluginClass") || has_key(spec, "ffiPlugin");
            let implemented = native || has_key(spec, "dartPluginClass") || has_key(spec, "default_package");

            let missing = match name {
                "android" if !has_key(spec, "package") && !has_key(spec, "default_package") => Some("package"),
                "web" if !has_key(spec, "default_package") && !(has_key(spec, "pluginClass") && has_key(spec, "fileName")) => {
                    Some("pluginClass and fileName")
                }
                _ if !implemented => Some("pluginClass, dartPluginClass or ffiPlugin"),
                _ => None,
            };
            if let Some(fields) = missing {
                findings.push(locate(
                    ValidationMessage::error(format!("Plugin platform '{}' is missing {}", name, fields))
                        .with_rule("platform.incomplete_plugin")
                        .with_fix(
                            FixSuggestion::manual(format!("Complete the '{}' plugin declaration", name))
                                .with_code_example(plugin_example(name))
                                .with_problem_type(ProblemType::Configuration)
                                .with_documentation(PLUGIN_DOCS),
                        ),
                ));
            }

            if findings.level().includes_advisory_rules() && native && name != "web" && !target.join(name).is_dir() {
                findings.advise(
                    ValidationMessage::warning(format!(
                        "Plugin declares '{}' but the '{}' directory is missing",
                        name, name
                    ))
                    .with_file(name)
                    .with_rule("platform.missing_platform_directory")
                    .with_fix(
                        FixSuggestion::manual(format!("Add the {} implementation or drop the declaration", name))
                            .with_documentation(PLUGIN_DOCS),
                    ),
                );
            }
        }

        if findings.level().includes_advisory_rules() && manifest.environment("flutter").is_none() {
            findings.advise(
                ValidationMessage::warning("Plugin does not constrain the Flutter SDK version")
                    .with_file(manifest.path())
                    .with_rule("platform.missing_flutter_constraint")
                    .with_fix(
                        FixSuggestion::suggested("Declare the minimum Flutter version")
                            .with_code_example("environment:\n  flutter: '>=3.10.0'\n")
                            .with_problem_type(ProblemType::Configuration)
                            .with_documentation(PUBSPEC_DOCS),
                    ),
            );
        }
    }

    fn check_enterprise(&self, manifest: &Manifest, findings: &mut Findings) {
        match manifest.get("topics") {
            None | Some(Value::Null) => findings.push(
                ValidationMessage::error("No 'topics' declared")
                    .with_file(manifest.path())
                    .with_rule("platform.missing_topics")
                    .with_fix(
                        FixSuggestion::manual(format!("Add 1 to {} topics", MAX_TOPICS))
                            .with_code_example("topics:\n  - networking\n  - http\n")
                            .with_problem_type(ProblemType::Configuration)
                            .with_documentation("https://dart.dev/tools/pub/pubspec#topics"),
                    ),
            ),
            Some(Value::Sequence(topics)) => {
                let names: Vec<&str> = topics.iter().filter_map(Value::as_str).collect();
                let invalid: Vec<&str> = names.iter().copied().filter(|t| !is_valid_topic(t)).collect();
                if topics.is_empty() || topics.len() > MAX_TOPICS || names.len() != topics.len() || !invalid.is_empty() {
                    findings.push(self.at_key(
                        manifest,
                        "topics",
                        ValidationMessage::error(format!(
                            "'topics' must list 1 to {} lowercase topics{}",
                            MAX_TOPICS,
                            if invalid.is_empty() { String::new() } else { format!(" (invalid: {})", invalid.join(", ")) }
                        ))
                        .with_rule("platform.invalid_topics")
                        .with_fix(FixSuggestion::manual("Fix the topic list").with_documentation("https://dart.dev/tools/pub/pubspec#topics")),
                    ));
                }
            }
            Some(_) => findings.push(self.at_key(
                manifest,
                "topics",
                ValidationMessage::error("'topics' must be a list").with_rule("platform.invalid_topics"),
            )),
        }

        if manifest.scalar("issue_tracker").is_none() {
            findings.push(
                ValidationMessage::error("No 'issue_tracker' declared")
                    .with_file(manifest.path())
                    .with_rule("platform.missing_issue_tracker")
                    .with_fix(
                        FixSuggestion::manual("Tell users where to report bugs")
                            .with_code_example("issue_tracker: https://github.com/owner/package/issues\n")
                            .with_problem_type(ProblemType::Configuration)
                            .with_documentation(PUBSPEC_DOCS),
                    ),
            );
        }
    }
}

impl Default for PlatformComplianceValidator {
    fn default() -> Self {
        Self::new(Toolchain::default(), RulesConfig::default())
    }
}

fn plugin_example(platform: &str) -> String {
    match platform {
        "android" => "android:\n  package: com.example.my_plugin\n  pluginClass: MyPlugin\n".to_string(),
        "web" => "web:\n  pluginClass: MyPluginWeb\n  fileName: my_plugin_web.dart\n".to_string(),
        other => format!("{}:\n  pluginClass: MyPlugin\n", other),
    }
}

#[async_trait]
impl Validator for PlatformComplianceValidator {
    async fn validate(&self, target: &Path, level: ValidationLevel) -> Result<ValidationResult> {
        let mut findings = Findings::new(NAME, level);

        let manifest = match Manifest::load(target, &self.toolchain.manifest_file) {
            ManifestState::Loaded(manifest) => manifest,
            ManifestState::Missing | ManifestState::Invalid(_) => {
                findings.push(
                    ValidationMessage::info(format!(
                        "No readable '{}'; platform checks skipped",
                        self.toolchain.manifest_file
                    ))
                    .with_rule("platform.manifest_unavailable"),
                );
                return Ok(findings.finish("Platform checks skipped"));
            }
        };

        self.check_identity(&manifest, &mut findings);
        self.check_declared_platforms(&manifest, &mut findings);
        self.check_plugin(target, &manifest, &mut findings);

        if level.includes_advisory_rules() {
            self.check_metadata(&manifest, &mut findings);
        }
        if level.is_enterprise() {
            self.check_enterprise(&manifest, &mut findings);
        }

        Ok(findings.finish("Package metadata follows platform conventions"))
    }

    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Platform
    }
}
