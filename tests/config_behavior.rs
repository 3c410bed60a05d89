//! Behaviour tests for loading and validating run configuration files.

use std::io::Write;

use ferrocast_core::{AnalysisConfig, CoreError, ProviderId, SimulationMode, Symbol};
use tempfile::NamedTempFile;
use time::macros::date;

fn config_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(json.as_bytes()).expect("write config");
    file
}

#[test]
fn file_overrides_merge_with_defaults() {
    // Given: a file that only names tickers, a window and a provider override
    let file = config_file(
        r#"{
            "portfolio_name": "Income",
            "tickers": ["ko", "PEP"],
            "indices": ["sp500"],
            "weights": {"KO": 0.5, "PEP": 0.4, "sp500": 0.1},
            "start_date": "2023-01-01",
            "end_date": "2023-12-31",
            "symbol_providers": {"PEP": "alphavantage"},
            "simulation": {"mode": {"kind": "all_holdings"}, "seed": 9}
        }"#,
    );

    // When: it is loaded
    let config = AnalysisConfig::from_path(file.path()).expect("config loads");

    // Then: file values win and everything else keeps its default
    assert_eq!(config.portfolio_name, "Income");
    assert_eq!(config.simulation.mode, SimulationMode::AllHoldings);
    assert_eq!(config.simulation.horizon_days, 252);
    assert_eq!(config.risk_free_rate, 0.02);
    assert_eq!(
        config.date_range(date!(2024 - 06 - 01)).expect("range"),
        (date!(2023 - 01 - 01), date!(2023 - 12 - 31))
    );

    let symbols: Vec<String> = config
        .symbols()
        .expect("symbols")
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(symbols, vec!["KO", "PEP", "^GSPC"]);
    assert_eq!(
        config.weight_for(&Symbol::parse("^GSPC").expect("symbol")),
        Some(0.1)
    );
    assert_eq!(
        config.symbol_overrides().expect("overrides"),
        vec![(Symbol::parse("PEP").expect("symbol"), ProviderId::Alphavantage)]
    );
    assert_eq!(config.simulation_params(None).seed, Some(9));
    assert_eq!(config.simulation_params(Some(1)).seed, Some(1));
}

#[test]
fn advisory_findings_are_collected_as_warnings() {
    // Given: overweight holdings, an unknown index and a stray single symbol
    let config = AnalysisConfig::from_json_str(
        r#"{
            "tickers": ["AAPL"],
            "indices": ["atlantis"],
            "weights": {"AAPL": 0.9, "MSFT": 0.3},
            "simulation": {"mode": {"kind": "single", "symbol": "NVDA"}}
        }"#,
    )
    .expect("config parses");

    // When: it is validated
    let warnings = config.validate();

    // Then: each finding is reported without failing
    assert!(warnings.iter().any(|w| w.contains("normalised")));
    assert!(warnings.iter().any(|w| w.contains("unknown index 'atlantis'")));
    assert!(warnings.iter().any(|w| w.contains("'NVDA'")));
    assert!(warnings.iter().any(|w| w.contains("MSFT")));
    assert!(config.validate_strict().is_ok());
}

#[test]
fn structural_errors_fail_strict_validation() {
    let bad_value = AnalysisConfig::from_json_str(r#"{"simulation": {"initial_value": -5.0}}"#)
        .expect("config parses");
    assert!(matches!(bad_value.validate_strict(), Err(CoreError::Config(_))));

    let bad_ticker =
        AnalysisConfig::from_json_str(r#"{"tickers": ["$$$"]}"#).expect("config parses");
    assert!(matches!(bad_ticker.validate_strict(), Err(CoreError::Validation(_))));

    let bad_window = AnalysisConfig::from_json_str(
        r#"{"start_date": "2024-02-01", "end_date": "2024-01-01"}"#,
    )
    .expect("config parses");
    assert!(bad_window.validate_strict().is_err());
    assert!(bad_window.date_range(date!(2024 - 06 - 01)).is_err());
}

#[test]
fn malformed_files_are_serialization_errors() {
    let file = config_file("{ not json");
    assert!(matches!(
        AnalysisConfig::from_path(file.path()),
        Err(CoreError::Serialization(_))
    ));
    assert!(matches!(
        AnalysisConfig::from_path("/definitely/not/here.json"),
        Err(CoreError::Io(_))
    ));
}
