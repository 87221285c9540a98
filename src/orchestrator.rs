//! Validation orchestrator.
//!
//! Selects validators for a level, runs them (in parallel when enabled),
//! merges their results in registration order and memoizes the merged result
//! in an optional cache store.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;

use crate::cache::{self, CacheStore};
use crate::config::Config;
use crate::diagnostic::{ValidationLevel, ValidationMessage, ValidationResult};
use crate::error::{GateError, Result};
use crate::process::ProcessExecutor;
use crate::validation::{
    DependencyValidator, PlatformComplianceValidator, QualityValidator, StructureValidator, Validator, ValidatorKind,
};

/// Runtime knobs for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Run validators concurrently
    pub parallel: bool,
    /// Upper bound on concurrently running validators
    pub max_parallel: usize,
    /// Lifetime of cached results
    pub cache_ttl: Duration,
    /// Directories left out of the tree fingerprint
    pub ignored_dirs: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_parallel: 4,
            cache_ttl: cache::DEFAULT_TTL,
            ignored_dirs: vec![".git".to_string(), ".dart_tool".to_string(), "build".to_string()],
        }
    }
}

impl OrchestratorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            parallel: config.validation.parallel,
            max_parallel: config.validation.max_parallel.max(1),
            cache_ttl: Duration::from_secs(config.cache.ttl_minutes * 60),
            ignored_dirs: config.layout.ignored_dirs.clone(),
        }
    }
}

/// Runs the validator suite against a package tree.
pub struct ValidationOrchestrator {
    validators: Vec<Arc<dyn Validator>>,
    cache: Option<Arc<dyn CacheStore>>,
    config: OrchestratorConfig,
}

impl ValidationOrchestrator {
    /// Create an orchestrator with no validators
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            validators: Vec::new(),
            cache: None,
            config,
        }
    }

    /// Orchestrator with the four built-in validators, configured from `config`
    pub fn with_defaults(config: &Config, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self::new(OrchestratorConfig::from_config(config))
            .with_validator(StructureValidator::new(
                config.layout.clone(),
                config.toolchain.clone(),
                config.rules.clone(),
            ))
            .with_validator(QualityValidator::new(
                executor,
                config.toolchain.clone(),
                config.rules.clone(),
            ))
            .with_validator(DependencyValidator::new(config.toolchain.clone(), config.rules.clone()))
            .with_validator(PlatformComplianceValidator::new(
                config.toolchain.clone(),
                config.rules.clone(),
            ))
    }

    /// Register a validator (builder pattern); merge order is registration order
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Register a shared validator
    pub fn add(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Names of the registered validators in registration order
    pub fn validator_names(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Run every registered validator that applies at `level`.
    pub async fn run(&self, target: &Path, level: ValidationLevel) -> ValidationResult {
        self.run_selected(target, level, None).await
    }

    /// Run only the validators of the given kinds.
    pub async fn run_only(&self, target: &Path, level: ValidationLevel, kinds: &[ValidatorKind]) -> ValidationResult {
        self.run_selected(target, level, Some(kinds)).await
    }

    fn select(&self, level: ValidationLevel, kinds: Option<&[ValidatorKind]>) -> Vec<Arc<dyn Validator>> {
        self.validators
            .iter()
            .filter(|v| kinds.is_none_or(|k| k.contains(&v.kind())))
            .filter(|v| {
                let applies = v.min_level() <= level;
                if !applies {
                    log::debug!("Skipping validator '{}' below {} level", v.name(), v.min_level());
                }
                applies
            })
            .cloned()
            .collect()
    }

    async fn run_selected(&self, target: &Path, level: ValidationLevel, kinds: Option<&[ValidatorKind]>) -> ValidationResult {
        let selected = self.select(level, kinds);
        let scope: Vec<String> = selected.iter().map(|v| v.name().to_string()).collect();

        let key = self.cache_key(target, level, &scope);
        if let Some(key) = &key
            && let Some(cached) = self.cache_lookup(key)
        {
            tracing::info!(path = %target.display(), %level, messages = cached.len(), "Using cached validation result");
            return cached;
        }

        let limit = if self.config.parallel { self.config.max_parallel.max(1) } else { 1 };
        let root: PathBuf = target.to_path_buf();

        let results: Vec<ValidationResult> = stream::iter(selected)
            .map(|validator| {
                let root = root.clone();
                async move {
                    let name = validator.name().to_string();
                    let handle = tokio::spawn(async move { validator.validate(&root, level).await });
                    settle(&name, handle.await)
                }
            })
            .buffered(limit)
            .collect()
            .await;

        let mut merged = ValidationResult::for_level(level);
        for result in results {
            merged.merge(result);
        }

        tracing::info!(
            path = %target.display(),
            %level,
            validators = scope.len(),
            errors = merged.errors().len(),
            warnings = merged.warnings().len(),
            "Validation finished"
        );

        if let Some(key) = &key {
            self.cache_store(key, &merged);
        }
        merged
    }

    fn cache_key(&self, target: &Path, level: ValidationLevel, scope: &[String]) -> Option<String> {
        self.cache.as_ref()?;
        let scope: Vec<&str> = scope.iter().map(String::as_str).collect();
        match cache::tree_fingerprint(target, &self.config.ignored_dirs) {
            Ok(fingerprint) => Some(cache::cache_key(target, level, &scope, &fingerprint)),
            Err(e) => {
                log::warn!("Cannot fingerprint {}; cache bypassed: {}", target.display(), e);
                None
            }
        }
    }

    fn cache_lookup(&self, key: &str) -> Option<ValidationResult> {
        let cache = self.cache.as_ref()?;
        let raw = match cache.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Cache read failed; recomputing: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(result) => Some(result),
            Err(e) => {
                log::warn!("Cached result is unreadable; recomputing: {}", e);
                None
            }
        }
    }

    fn cache_store(&self, key: &str, result: &ValidationResult) {
        let Some(cache) = &self.cache else {
            return;
        };
        let stored = serde_json::to_string(result)
            .map_err(GateError::from)
            .and_then(|json| cache.set(key, json, self.config.cache_ttl));
        if let Err(e) = stored {
            log::warn!("Cache write failed: {}", e);
        }
    }
}

/// Turn a validator's outcome into its result, or a single Error message
/// naming it when it failed or panicked.
fn settle(name: &str, outcome: std::result::Result<Result<ValidationResult>, JoinError>) -> ValidationResult {
    let failure = match outcome {
        Ok(Ok(result)) => return result,
        Ok(Err(e)) => e.to_string(),
        Err(e) if e.is_panic() => "validator panicked".to_string(),
        Err(e) => e.to_string(),
    };

    let error = GateError::Validator {
        name: name.to_string(),
        message: failure,
    };
    log::error!("{}", error);
    let mut result = ValidationResult::new();
    result.push(
        ValidationMessage::error(error.to_string())
            .with_rule("orchestrator.validator_failed")
            .from_validator(name),
    );
    result.record_validator(name);
    result
}
