use ferrocast_core::indices::{self, IndexInfo};
use serde::Serialize;

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct IndicesResponseData {
    indices: &'static [IndexInfo],
}

pub fn run() -> Result<CommandResult, CliError> {
    let catalog = indices::catalog();
    let data = serde_json::to_value(IndicesResponseData { indices: catalog })?;
    Ok(CommandResult::ok(data, render_markdown(catalog)))
}

fn render_markdown(catalog: &[IndexInfo]) -> String {
    let mut out = String::from("# Market Indices\n\n| Key | Symbol | Name | Description |\n|-----|--------|------|-------------|\n");
    for info in catalog {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            info.key, info.symbol, info.name, info.description
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_catalog_entry() {
        let result = run().expect("indices");
        let entries = result.data["indices"].as_array().expect("array");
        assert_eq!(entries.len(), indices::catalog().len());
        assert_eq!(entries[0]["symbol"], "^GSPC");
        assert!(result.markdown.contains("| sp500 | ^GSPC | S&P 500 |"));
    }
}
