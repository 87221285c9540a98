//! `pubspec.yaml` model shared by the dependency and platform validators.
//!
//! The manifest is kept as a raw YAML mapping rather than a strict struct so
//! that a wrongly typed field becomes a finding on that field instead of a
//! parse failure of the whole file.

use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GateError, Result};

/// Outcome of looking for the manifest.
#[derive(Debug, Clone)]
pub enum ManifestState {
    Missing,
    Invalid(String),
    Loaded(Manifest),
}

/// Which dependency table an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencySection {
    Regular,
    Dev,
    Override,
}

impl DependencySection {
    pub fn key(&self) -> &'static str {
        match self {
            DependencySection::Regular => "dependencies",
            DependencySection::Dev => "dev_dependencies",
            DependencySection::Override => "dependency_overrides",
        }
    }
}

/// Where a dependency is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencySource {
    /// Package repository; `None` means no constraint was given
    Hosted { constraint: Option<String> },
    Git { url: String, git_ref: Option<String> },
    Path(String),
    Sdk(String),
    /// A declaration shape we do not understand
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub section: DependencySection,
    pub source: DependencySource,
}

/// Parsed package manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    raw: String,
    root: Mapping,
}

impl Manifest {
    /// Load `file_name` from `target`.
    pub fn load(target: &Path, file_name: &str) -> ManifestState {
        let path = target.join(file_name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ManifestState::Missing,
            Err(e) => return ManifestState::Invalid(format!("cannot read {}: {}", file_name, e)),
        };
        match Self::parse(PathBuf::from(file_name), raw) {
            Ok(manifest) => ManifestState::Loaded(manifest),
            Err(GateError::Manifest(reason)) => ManifestState::Invalid(reason),
            Err(GateError::Yaml(e)) => ManifestState::Invalid(e.to_string()),
            Err(e) => ManifestState::Invalid(e.to_string()),
        }
    }

    /// Parse manifest text; `path` is only used for reporting.
    pub fn parse(path: PathBuf, raw: String) -> Result<Self> {
        let value: Value = serde_yaml::from_str(&raw)?;
        match value {
            Value::Mapping(root) => Ok(Self { path, raw, root }),
            Value::Null => Err(GateError::Manifest("manifest is empty".to_string())),
            _ => Err(GateError::Manifest("manifest top level must be a mapping".to_string())),
        }
    }

    /// Manifest path relative to the package root
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Scalar field rendered as text. Numbers are accepted because YAML reads
    /// `version: 1.0` as a float.
    pub fn scalar(&self, key: &str) -> Option<String> {
        self.get(key).and_then(scalar_text)
    }

    pub fn name(&self) -> Option<String> {
        self.scalar("name")
    }

    pub fn version(&self) -> Option<String> {
        self.scalar("version")
    }

    pub fn description(&self) -> Option<String> {
        self.scalar("description")
    }

    /// `environment.<key>` constraint, e.g. `sdk` or `flutter`
    pub fn environment(&self, key: &str) -> Option<String> {
        self.get("environment")
            .and_then(Value::as_mapping)
            .and_then(|env| env.get(key))
            .and_then(scalar_text)
    }

    /// `flutter.plugin.platforms` mapping, when the package is a plugin
    pub fn plugin_platforms(&self) -> Option<&Mapping> {
        self.get("flutter")?
            .as_mapping()?
            .get("plugin")?
            .as_mapping()?
            .get("platforms")?
            .as_mapping()
    }

    pub fn is_flutter_package(&self) -> bool {
        self.get("flutter").is_some() || self.environment("flutter").is_some()
            || self.dependencies().iter().any(|d| d.name == "flutter")
    }

    /// All declared dependencies in file order: regular, dev, overrides.
    pub fn dependencies(&self) -> Vec<Dependency> {
        [DependencySection::Regular, DependencySection::Dev, DependencySection::Override]
            .into_iter()
            .flat_map(|section| self.section(section))
            .collect()
    }

    pub fn section(&self, section: DependencySection) -> Vec<Dependency> {
        let Some(table) = self.get(section.key()).and_then(Value::as_mapping) else {
            return Vec::new();
        };
        table
            .iter()
            .filter_map(|(name, spec)| {
                let name = name.as_str()?.to_string();
                Some(Dependency {
                    name,
                    section,
                    source: classify_source(spec),
                })
            })
            .collect()
    }

    /// 1-based line of a top-level key
    pub fn line_of(&self, key: &str) -> Option<u32> {
        let prefix = format!("{}:", key);
        self.raw
            .lines()
            .position(|line| line.starts_with(&prefix))
            .map(|i| i as u32 + 1)
    }

    /// 1-based line of `key` nested under the top-level `parent` block
    pub fn line_of_nested(&self, parent: &str, key: &str) -> Option<u32> {
        let start = self.line_of(parent)? as usize;
        let prefix = format!("{}:", key);
        for (offset, line) in self.raw.lines().skip(start).enumerate() {
            if !line.is_empty() && !line.starts_with(char::is_whitespace) && !line.starts_with('#') {
                break;
            }
            if line.trim_start().starts_with(&prefix) {
                return Some((start + offset + 1) as u32);
            }
        }
        None
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn classify_source(spec: &Value) -> DependencySource {
    match spec {
        Value::Null => DependencySource::Hosted { constraint: None },
        Value::String(_) | Value::Number(_) => DependencySource::Hosted {
            constraint: scalar_text(spec),
        },
        Value::Mapping(map) => {
            if let Some(git) = map.get("git") {
                return match git {
                    Value::String(url) => DependencySource::Git {
                        url: url.clone(),
                        git_ref: None,
                    },
                    Value::Mapping(g) => DependencySource::Git {
                        url: g.get("url").and_then(scalar_text).unwrap_or_default(),
                        git_ref: g.get("ref").and_then(scalar_text),
                    },
                    _ => DependencySource::Unrecognized("git source must be a URL or mapping".to_string()),
                };
            }
            if let Some(path) = map.get("path") {
                return DependencySource::Path(scalar_text(path).unwrap_or_default());
            }
            if let Some(sdk) = map.get("sdk") {
                return DependencySource::Sdk(scalar_text(sdk).unwrap_or_default());
            }
            if map.contains_key("hosted") || map.contains_key("version") {
                return DependencySource::Hosted {
                    constraint: map.get("version").and_then(scalar_text),
                };
            }
            DependencySource::Unrecognized("unknown dependency source".to_string())
        }
        _ => DependencySource::Unrecognized("dependency must be a constraint or mapping".to_string()),
    }
}
