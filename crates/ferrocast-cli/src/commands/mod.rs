mod analyze;
mod check_config;
mod indices;

use ferrocast_core::UtcDateTime;
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::Metadata;
use crate::output::Document;

pub struct CommandResult {
    pub data: Value,
    pub markdown: String,
    pub warnings: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value, markdown: String) -> Self {
        Self {
            data,
            markdown,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Document, CliError> {
    let generated_at = UtcDateTime::now();

    let CommandResult {
        data,
        markdown,
        warnings,
    } = match &cli.command {
        Command::Analyze(args) => analyze::run(args, generated_at).await?,
        Command::Indices => indices::run()?,
        Command::CheckConfig(args) => check_config::run(args)?,
    };

    let mut meta = Metadata::new(generated_at);
    for warning in warnings {
        meta.push_warning(warning);
    }

    Ok(Document {
        meta,
        data,
        markdown,
    })
}
