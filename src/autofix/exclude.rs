//! Exclude patterns matched against a message's file.

use glob::Pattern;
use std::path::Path;

#[derive(Debug, Clone)]
enum Matcher {
    Glob(Pattern),
    Substring(String),
}

/// Compiled exclude patterns.
///
/// Patterns containing `*`, `?` or `[` are globs matched against the whole
/// path and against the file name. Anything else, including a glob that does
/// not compile, is a plain substring of the path.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<(String, Matcher)>,
}

impl ExcludeSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| !p.is_empty())
            .map(|raw| {
                let matcher = if raw.contains(['*', '?', '[']) {
                    match Pattern::new(raw) {
                        Ok(pattern) => Matcher::Glob(pattern),
                        Err(e) => {
                            log::warn!("Exclude pattern '{}' is not a valid glob ({}); matching as text", raw, e);
                            Matcher::Substring(raw.to_string())
                        }
                    }
                } else {
                    Matcher::Substring(raw.to_string())
                };
                (raw.to_string(), matcher)
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The first pattern matching `path`
    pub fn matching(&self, path: &Path) -> Option<&str> {
        let text = path.to_string_lossy().replace('\\', "/");
        let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();

        self.patterns
            .iter()
            .find(|(_, matcher)| match matcher {
                Matcher::Glob(pattern) => pattern.matches(&text) || pattern.matches(&name),
                Matcher::Substring(s) => text.contains(s.as_str()),
            })
            .map(|(raw, _)| raw.as_str())
    }
}
