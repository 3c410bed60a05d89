mod cli;
mod commands;
mod error;
mod metadata;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let document = commands::run(cli).await?;
    output::render(&document, cli.format, cli.pretty)?;

    if cli.strict && !document.meta.warnings.is_empty() {
        return Err(CliError::StrictModeViolation {
            warning_count: document.meta.warnings.len(),
        });
    }

    Ok(ExitCode::SUCCESS)
}
