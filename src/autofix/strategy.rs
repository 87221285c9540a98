//! Strategy selection for automatic fixes without an explicit command.

use crate::diagnostic::{ProblemType, ValidationMessage};

// Keywords are whole-word phrases: "format" never matches "information".
const FORMATTING_KEYWORDS: &[&str] = &[
    "format",
    "formatted",
    "formatter",
    "formatting",
    "unformatted",
    "whitespace",
    "indent",
    "indentation",
    "line length",
    "line too long",
    "lines longer",
    "trailing space",
    "trailing spaces",
    "trailing comma",
    "newline",
];

const IMPORT_KEYWORDS: &[&str] = &["import", "imports", "imported", "directive", "directives"];

const CONFIGURATION_KEYWORDS: &[&str] = &[
    "pubspec",
    "manifest",
    "analysis_options",
    "lint config",
    "configuration",
    "lockfile",
    "lock file",
];

const DOCUMENTATION_KEYWORDS: &[&str] = &[
    "documentation",
    "undocumented",
    "doc comment",
    "comment",
    "comments",
    "dartdoc",
];

/// Lowercase words of `text`, split on anything but letters, digits and `_`.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_phrase(words: &[String], phrase: &str) -> bool {
    let phrase: Vec<&str> = phrase.split_whitespace().collect();
    !phrase.is_empty()
        && words
            .windows(phrase.len())
            .any(|window| window.iter().zip(&phrase).all(|(w, p)| w == p))
}

/// Guess a problem type from message text.
///
/// Categories are tried in order: formatting, imports, configuration,
/// documentation. `None` when no keyword matches.
pub fn classify_problem(text: &str) -> Option<ProblemType> {
    let words = words(text);
    let hits = |keywords: &[&str]| keywords.iter().any(|k| contains_phrase(&words, k));

    if hits(FORMATTING_KEYWORDS) {
        Some(ProblemType::Formatting)
    } else if hits(IMPORT_KEYWORDS) {
        Some(ProblemType::Imports)
    } else if hits(CONFIGURATION_KEYWORDS) {
        Some(ProblemType::Configuration)
    } else if hits(DOCUMENTATION_KEYWORDS) {
        Some(ProblemType::Documentation)
    } else {
        None
    }
}

/// Problem type carried by the suggestion, falling back to the keyword
/// classifier over the message text.
pub fn resolve_problem(message: &ValidationMessage) -> Option<ProblemType> {
    message
        .fix_suggestion
        .as_ref()
        .and_then(|fix| fix.problem_type)
        .or_else(|| classify_problem(&message.message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::FixSuggestion;

    #[test]
    fn test_classify_keywords() {
        assert_eq!(classify_problem("File is not formatted"), Some(ProblemType::Formatting));
        assert_eq!(classify_problem("Line too long (92 > 80)"), Some(ProblemType::Formatting));
        assert_eq!(classify_problem("Unused import: 'dart:io'"), Some(ProblemType::Imports));
        assert_eq!(classify_problem("Sort directive sections"), Some(ProblemType::Imports));
        assert_eq!(classify_problem("pubspec.lock is out of date"), Some(ProblemType::Configuration));
        assert_eq!(classify_problem("Missing doc comment"), Some(ProblemType::Documentation));
        assert_eq!(classify_problem("Undefined name 'foo'"), None);
    }

    #[test]
    fn test_classify_matches_whole_words_only() {
        assert_eq!(
            classify_problem("Missing package information in manifest"),
            Some(ProblemType::Configuration)
        );
        assert_eq!(classify_problem("Important: lockfile is stale"), Some(ProblemType::Configuration));
        assert_eq!(classify_problem("Platform support is incomplete"), None);
        assert_eq!(classify_problem("Commentary is welcome"), None);
        assert_eq!(classify_problem("analysis_options.yaml is missing"), Some(ProblemType::Configuration));
        assert_eq!(classify_problem("Trailing  spaces found"), Some(ProblemType::Formatting));
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify_problem("UNUSED IMPORT"), Some(ProblemType::Imports));
    }

    #[test]
    fn test_explicit_problem_type_wins() {
        let message = ValidationMessage::warning("Unused import")
            .with_fix(FixSuggestion::automatic("fix").with_problem_type(ProblemType::Formatting));
        assert_eq!(resolve_problem(&message), Some(ProblemType::Formatting));

        let untyped = ValidationMessage::warning("Unused import").with_fix(FixSuggestion::automatic("fix"));
        assert_eq!(resolve_problem(&untyped), Some(ProblemType::Imports));
    }
}
