// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! NOTE: this expects `clap` to be built with the `derive` feature, e.g.:
//! `clap = { version = "4.5.53", features = ["derive"] }` in `Cargo.toml`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `spawnwatch`.
///
/// Flags must come before `PROGRAM`; everything after it is handed to
/// the child verbatim as an argv vector — no shell is involved.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "spawnwatch",
    version,
    about = "Launch an executable, supervise its startup, and stream its output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the launch file (TOML).
    ///
    /// Default: `Spawnwatch.toml` in the current working directory, used
    /// only when no PROGRAM is given on the command line.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Executable to launch (overrides `[launch].program` from the
    /// launch file).
    #[arg(value_name = "PROGRAM")]
    pub program: Option<String>,

    /// Arguments passed to the child, verbatim.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Startup window in milliseconds: how long the child must survive
    /// before it counts as running.
    #[arg(long, value_name = "MS")]
    pub startup_window_ms: Option<u64>,

    /// Poll interval in milliseconds for the startup loop and the
    /// output reader loop.
    #[arg(long, value_name = "MS")]
    pub tick_ms: Option<u64>,

    /// Do not inherit the parent environment; the child gets only the
    /// variables from `[launch.env]` (or nothing at all).
    #[arg(long)]
    pub no_inherit_env: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SPAWNWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the launch plan, but don't fork anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
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
