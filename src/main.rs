use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;

use cli::Cli;
use cli::commands::{CacheCommands, Commands, ValidateArgs};
use modgate::autofix::{AutoFixManager, AutoFixOptions, FixResultType, FixRun};
use modgate::cache::{CacheStore, FileCacheStore};
use modgate::config::Config;
use modgate::diagnostic::{Severity, ValidationLevel, ValidationResult};
use modgate::orchestrator::ValidationOrchestrator;
use modgate::process::{ProcessExecutor, ShellExecutor};
use modgate::validation::ValidatorKind;

/// Exit status for failures of modgate itself, as opposed to a failed validation
const EXIT_INTERNAL_ERROR: i32 = 2;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("modgate")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("modgate.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<i32> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Validate(args) => handle_validate_command(args, config, cli.is_verbose()).await,
        Commands::Cache { command } => handle_cache_command(command, config),
    }
}

fn resolve_level(requested: Option<&str>, config: &Config) -> ValidationLevel {
    match requested {
        None => config.level(),
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            log::warn!("{}; falling back to standard", e);
            println!("{} {}; using standard", "Warning:".yellow(), e);
            ValidationLevel::Standard
        }),
    }
}

fn build_orchestrator(args: &ValidateArgs, config: &Config, executor: Arc<dyn ProcessExecutor>) -> ValidationOrchestrator {
    let mut config = config.clone();
    if args.sequential {
        config.validation.parallel = false;
    }
    let orchestrator = ValidationOrchestrator::with_defaults(&config, executor);

    if args.no_cache || !config.cache.enabled {
        return orchestrator;
    }
    match FileCacheStore::new(&config.cache.dir) {
        Ok(store) => orchestrator.with_cache(Arc::new(store)),
        Err(e) => {
            log::warn!("Result cache unavailable at {}: {}", config.cache.dir.display(), e);
            orchestrator
        }
    }
}

async fn validate(
    orchestrator: &ValidationOrchestrator,
    args: &ValidateArgs,
    level: ValidationLevel,
    kinds: &[ValidatorKind],
) -> ValidationResult {
    if kinds.is_empty() {
        orchestrator.run(&args.path, level).await
    } else {
        orchestrator.run_only(&args.path, level, kinds).await
    }
}

async fn handle_validate_command(args: &ValidateArgs, config: &Config, verbose: bool) -> Result<i32> {
    if !args.path.is_dir() {
        return Err(eyre!("{} is not a directory", args.path.display()));
    }

    let level = resolve_level(args.level.as_deref(), config);
    let kinds = args
        .only
        .iter()
        .map(|name| name.parse::<ValidatorKind>().map_err(|e| eyre!(e)))
        .collect::<Result<Vec<_>>>()?;

    info!("Validating {} at {} level", args.path.display(), level);
    println!("{} {} ({})", "Validating".cyan(), args.path.display(), level);

    let executor: Arc<dyn ProcessExecutor> =
        Arc::new(ShellExecutor::native().with_timeout_ms(config.toolchain.timeout_ms));
    let orchestrator = build_orchestrator(args, config, executor);

    let result = validate(&orchestrator, args, level, &kinds).await;
    print_result(&result, verbose);

    if !args.fix {
        return Ok(result.exit_code());
    }

    let mut options = AutoFixOptions::from_config(&config.autofix, &args.path);
    if let Some(continue_on_error) = args.continue_on_error {
        options = options.continue_on_error(continue_on_error);
    }
    for pattern in &args.exclude {
        options = options.exclude(pattern.clone());
    }

    let fix_executor = Arc::new(ShellExecutor::native().with_timeout_ms(config.autofix.command_timeout_ms));
    let mut manager = AutoFixManager::new(options, config.toolchain.clone(), fix_executor);
    let run = manager.fix(&result).await;
    print_fix_run(&run);

    if run.statistics.success_count == 0 {
        return Ok(result.exit_code());
    }

    println!("{}", "Re-validating after fixes".cyan());
    let after = validate(&orchestrator, args, level, &kinds).await;
    print_counts(&after);
    Ok(after.exit_code())
}

fn handle_cache_command(command: &CacheCommands, config: &Config) -> Result<i32> {
    match command {
        CacheCommands::Clear => {
            let store = FileCacheStore::new(&config.cache.dir)
                .with_context(|| format!("Failed to open cache at {}", config.cache.dir.display()))?;
            store.clear().context("Failed to clear cache")?;
            info!("Cleared cache at {}", config.cache.dir.display());
            println!("{} {}", "Cleared".green(), config.cache.dir.display());
        }
    }
    Ok(0)
}

fn severity_tag(severity: Severity) -> ColoredString {
    match severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow(),
        Severity::Info => "info".blue(),
        Severity::Success => "ok".green(),
    }
}

fn print_result(result: &ValidationResult, verbose: bool) {
    for message in result.iter() {
        if message.severity == Severity::Success && !verbose {
            continue;
        }
        let location = message.location().map(|l| format!(" {}", l.dimmed())).unwrap_or_default();
        println!("  {:>7}{} {}", severity_tag(message.severity), location, message.message);
        if verbose && let Some(fix) = &message.fix_suggestion {
            println!("          {} ({})", fix.description.dimmed(), fix.fixability);
        }
    }
    print_counts(result);
}

fn print_counts(result: &ValidationResult) {
    let summary = format!(
        "{} errors, {} warnings, {} infos",
        result.errors().len(),
        result.warnings().len(),
        result.infos().len()
    );
    if result.has_errors() {
        println!("{} {}", "FAILED".red().bold(), summary);
    } else {
        println!("{} {}", "PASSED".green().bold(), summary);
    }
}

fn print_fix_run(run: &FixRun) {
    for record in &run.records {
        let tag = match record.result.kind {
            FixResultType::Success => "fixed".green(),
            FixResultType::Failed => "failed".red(),
            FixResultType::Skipped => "skipped".yellow(),
            FixResultType::Unsupported => "unsupported".dimmed(),
        };
        println!("  {:>11} {}", tag, record.result.message);
        if let Some(details) = &record.result.details
            && record.result.kind == FixResultType::Failed
        {
            println!("              {}", details.dimmed());
        }
    }
    if run.aborted {
        println!("{}", "Stopped after a failed fix".red());
    }
    println!("{} {}", "Auto-fix:".cyan(), run.statistics);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    match run_application(&cli, &config).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            log::error!("Application failed: {:?}", e);
            eprintln!("{} {:?}", "Error:".red().bold(), e);
            std::process::exit(EXIT_INTERNAL_ERROR);
        }
    }
}
