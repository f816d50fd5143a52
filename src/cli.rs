// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `wrapngo`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "wrapngo",
    version,
    about = "Wrap a command with placeholder-driven arguments and pre/post operations.",
    long_about = None
)]
pub struct CliArgs {
    /// Name of the task to run. Every task with this name runs concurrently.
    #[arg(value_name = "TASK", required_unless_present_any = ["list", "init"])]
    pub task: Option<String>,

    /// Directory holding `config.toml` / `config.json` / `config.yaml` and
    /// extra task files.
    ///
    /// Default: `WRAPNGO_CONFIG_DIR`, then `<user config dir>/wrapngo`.
    #[arg(long, value_name = "DIR", conflicts_with = "config")]
    pub config_dir: Option<PathBuf>,

    /// Load exactly this file instead of a config directory.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WRAPNGO_LOG`, then `Debug` in `[GeneralSettings]`, then
    /// `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the command lines of TASK without executing them.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the configured task names and exit.
    #[arg(long, conflicts_with = "init")]
    pub list: bool,

    /// Write a starter `config.toml` into the config directory and exit.
    #[arg(long, conflicts_with = "config")]
    pub init: bool,

    /// With `--init`, overwrite an existing `config.toml`.
    #[arg(long, requires = "init")]
    pub force: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
