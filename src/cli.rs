// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `stepdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stepdag",
    version,
    about = "Encode an ordered list of tracks gaplessly, in parallel, in two stages.",
    long_about = None
)]
pub struct CliArgs {
    /// Input files, in playback order.
    ///
    /// Each file's neighbours are passed to the encoder so track boundaries
    /// stay gapless.
    #[arg(value_name = "ITEM")]
    pub items: Vec<String>,

    /// Path to a config file (TOML). Built-in defaults are used if omitted.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Number of worker threads.
    ///
    /// Overrides `[scheduler].workers`; defaults to the physical core count.
    #[arg(long, short = 'j', value_name = "N")]
    pub workers: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STEPDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the plan and the commands it would run, but run nothing.
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
