use ferrocast_core::AnalysisConfig;
use serde::Serialize;

use crate::cli::CheckConfigArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct CheckConfigResponseData {
    valid: bool,
    symbols: Vec<String>,
    config: AnalysisConfig,
}

/// Structural errors fail the command; advisory findings become warnings.
pub fn run(args: &CheckConfigArgs) -> Result<CommandResult, CliError> {
    let config = AnalysisConfig::from_path(&args.config)?;
    config.validate_strict()?;
    let warnings = config.validate();

    let symbols = config
        .symbols()?
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    let mut markdown = format!(
        "# Configuration: {}\n\nPortfolio **{}** with {} symbols: {}\n",
        args.config.display(),
        config.portfolio_name,
        symbols.len(),
        symbols.join(", ")
    );
    if warnings.is_empty() {
        markdown.push_str("\nNo warnings.\n");
    }

    let data = serde_json::to_value(CheckConfigResponseData {
        valid: true,
        symbols,
        config,
    })?;
    Ok(CommandResult::ok(data, markdown).with_warnings(warnings))
}
