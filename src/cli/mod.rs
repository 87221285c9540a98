//! CLI module for modgate - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
