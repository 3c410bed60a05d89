use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::metadata::Metadata;

/// What a command produced, in both renderings.
#[derive(Debug, Serialize)]
pub struct Document {
    pub meta: Metadata,
    pub data: Value,
    #[serde(skip)]
    pub markdown: String,
}

pub fn render(document: &Document, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(document)?
            } else {
                serde_json::to_string(document)?
            };
            println!("{payload}");
        }
        OutputFormat::Markdown => print!("{}", render_markdown(document)),
    }
    Ok(())
}

fn render_markdown(document: &Document) -> String {
    let mut out = document.markdown.clone();
    if !document.meta.warnings.is_empty() {
        if !out.is_empty() && !out.ends_with("\n\n") {
            out.push('\n');
        }
        out.push_str("## Run Warnings\n\n");
        for warning in &document.meta.warnings {
            out.push_str(&format!("- {warning}\n"));
        }
    }
    out.push_str(&format!(
        "\n_run {} at {}_\n",
        document.meta.run_id, document.meta.generated_at
    ));
    out
}
