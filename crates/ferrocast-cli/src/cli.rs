//! CLI argument definitions for Ferrocast.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `analyze` | Fetch, clean, report on and simulate a portfolio |
//! | `indices` | List the known market indices |
//! | `check-config` | Validate a configuration file |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, markdown) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `--verbose` | `false` | Debug-level logging on stderr |
//!
//! # Examples
//!
//! ```bash
//! ferrocast analyze --config portfolio.json --seed 42 --pretty
//! ferrocast analyze --series-file aapl.json --format markdown
//! ferrocast check-config --config portfolio.json --strict
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Portfolio analysis and Monte Carlo projection.
#[derive(Debug, Parser)]
#[command(
    name = "ferrocast",
    author,
    version,
    about = "Portfolio analysis and Monte Carlo projection CLI",
    long_about = "Ferrocast downloads daily price histories, cleans them, aggregates them into a \
weighted portfolio and projects future values with Monte Carlo simulation.\n\
\n\
Use 'ferrocast <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON document with run metadata.
    Json,
    /// Human-readable Markdown.
    Markdown,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full analysis: fetch, clean, report and simulate.
    ///
    /// # Examples
    ///
    ///   ferrocast analyze --config portfolio.json
    ///   ferrocast analyze --series-file aapl.json --series-file msft.json --seed 7
    Analyze(AnalyzeArgs),

    /// List the market index catalog.
    Indices,

    /// Validate a configuration file and print its warnings.
    CheckConfig(CheckConfigArgs),
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// JSON configuration file; defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Load a price series from a JSON file instead of fetching (repeatable).
    #[arg(long = "series-file")]
    pub series_files: Vec<PathBuf>,

    /// Seed for reproducible simulations (overrides the configured seed).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Where to write the Markdown report (defaults to report.output_path).
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Include percentile trajectories in the simulation output.
    #[arg(long, default_value_t = false)]
    pub trajectories: bool,
}

#[derive(Debug, Args)]
pub struct CheckConfigArgs {
    /// JSON configuration file.
    #[arg(long)]
    pub config: PathBuf,
}
