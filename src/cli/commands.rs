//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - validate: run the validator suite, optionally followed by auto-fix
//! - cache: manage stored validation results

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// modgate - quality gate for generated Dart/Flutter packages
#[derive(Parser, Debug)]
#[command(name = "modgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a package tree
    Validate(ValidateArgs),

    /// Result cache management
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Package root to validate
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Validation level (basic, standard, strict, enterprise)
    #[arg(short, long)]
    pub level: Option<String>,

    /// Only run these validators (structure, quality, dependency, platform)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Apply automatic fixes after validating
    #[arg(long)]
    pub fix: bool,

    /// Keep fixing after a fix fails (overrides the config file)
    #[arg(long)]
    pub continue_on_error: Option<bool>,

    /// Never fix files matching this glob or substring (repeatable)
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Ignore and do not update the result cache
    #[arg(long)]
    pub no_cache: bool,

    /// Run validators one at a time
    #[arg(long)]
    pub sequential: bool,
}

/// Cache subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheCommands {
    /// Delete every stored validation result
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn validate(args: &[&str]) -> ValidateArgs {
        let mut argv = vec!["modgate", "validate"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Validate(args) => args,
            other => panic!("Expected validate command, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_defaults() {
        let args = validate(&[]);
        assert_eq!(args.path, PathBuf::from("."));
        assert!(args.level.is_none());
        assert!(args.only.is_empty());
        assert!(!args.fix);
        assert!(args.continue_on_error.is_none());
        assert!(!args.no_cache);
        assert!(!args.sequential);
    }

    #[test]
    fn test_validate_all_flags() {
        let args = validate(&[
            "packages/core",
            "--level",
            "strict",
            "--only",
            "structure,quality",
            "--fix",
            "--continue-on-error",
            "false",
            "-e",
            "*.g.dart",
            "--exclude",
            "generated",
            "--no-cache",
            "--sequential",
        ]);
        assert_eq!(args.path, PathBuf::from("packages/core"));
        assert_eq!(args.level.as_deref(), Some("strict"));
        assert_eq!(args.only, vec!["structure", "quality"]);
        assert!(args.fix);
        assert_eq!(args.continue_on_error, Some(false));
        assert_eq!(args.exclude, vec!["*.g.dart", "generated"]);
        assert!(args.no_cache);
        assert!(args.sequential);
    }

    #[test]
    fn test_cache_clear() {
        let cli = Cli::try_parse_from(["modgate", "cache", "clear"]).unwrap();
        match cli.command {
            Commands::Cache { command } => assert_eq!(command, CacheCommands::Clear),
            other => panic!("Expected cache command, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["modgate", "validate", "-c", "custom.yml", "-v"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.yml")));
        assert!(cli.is_verbose());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["modgate"]).is_err());
    }

    #[test]
    fn test_help_works() {
        Cli::command().debug_assert();
    }
}
