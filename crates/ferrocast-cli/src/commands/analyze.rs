use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ferrocast_core::config::{self, SimulationMode};
use ferrocast_core::{
    report, simulate_price, AlphaVantageAdapter, AnalysisConfig, CleanReport, Portfolio,
    PortfolioStatistics, PriceSeries, PriceSource, SeriesStatistics, SimulationParams,
    SimulationRun, SourceRegistry, Symbol, UtcDateTime, YahooAdapter,
};
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::AnalyzeArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct HoldingData {
    symbol: Symbol,
    name: String,
    weight: f64,
    points: usize,
}

#[derive(Debug, Serialize)]
struct PortfolioData {
    name: String,
    total_weight: f64,
    holdings: Vec<HoldingData>,
    statistics: Option<PortfolioStatistics>,
}

#[derive(Debug, Serialize)]
struct FailureData {
    code: &'static str,
    message: String,
    retryable: bool,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponseData {
    portfolio: PortfolioData,
    series: Vec<SeriesStatistics>,
    cleaning: BTreeMap<Symbol, CleanReport>,
    failures: BTreeMap<Symbol, FailureData>,
    simulations: Vec<SimulationRun>,
    report_path: PathBuf,
}

pub async fn run(args: &AnalyzeArgs, generated_at: UtcDateTime) -> Result<CommandResult, CliError> {
    let config = match &args.config {
        Some(path) => AnalysisConfig::from_path(path)?,
        None => AnalysisConfig::default(),
    };
    config.validate_strict()?;
    let mut warnings = config.validate();

    let (loaded, failures) = if args.series_files.is_empty() {
        fetch_series(&config, generated_at).await?
    } else {
        (load_series_files(&args.series_files)?, BTreeMap::new())
    };
    for (symbol, failure) in &failures {
        warnings.push(format!("{symbol}: {}", failure.message));
    }

    let options = config.clean_options();
    let mut cleaning = BTreeMap::new();
    let mut available = BTreeMap::new();
    for mut series in loaded {
        let report = series.clean(&options);
        if report.outlier_filter_skipped {
            warnings.push(format!(
                "{}: outlier filter skipped, returns have no spread",
                series.symbol()
            ));
        }
        cleaning.insert(series.symbol().clone(), report);
        available.insert(series.symbol().clone(), series);
    }

    let portfolio = build_portfolio(&config, &available, &mut warnings)?;
    let initial_value = config.simulation.initial_value;

    let params = config.simulation_params(args.seed);
    let mut rng = params.rng();
    let with_trajectories = args.trajectories || config.simulation.include_trajectories;
    let simulations = simulate(
        &config.simulation.mode,
        &portfolio,
        &available,
        &params,
        initial_value,
        with_trajectories,
        &mut rng,
        &mut warnings,
    );

    let mut markdown = report::render_portfolio_report(
        &portfolio,
        &config.report,
        config.risk_free_rate,
        initial_value,
        generated_at,
    );
    let section = report::render_simulation_section(&simulations);
    if !section.is_empty() {
        markdown.push('\n');
        markdown.push_str(&section);
    }

    let report_path = args
        .output
        .clone()
        .unwrap_or_else(|| config.report.output_path.clone());
    write_report(&report_path, &markdown)?;

    let data = AnalyzeResponseData {
        portfolio: PortfolioData {
            name: portfolio.name().to_owned(),
            total_weight: portfolio.total_weight(),
            holdings: portfolio
                .holdings()
                .iter()
                .map(|(symbol, weight)| HoldingData {
                    symbol: symbol.clone(),
                    name: portfolio
                        .series(symbol)
                        .map_or_else(|| symbol.to_string(), |s| s.name().to_owned()),
                    weight: *weight,
                    points: portfolio.series(symbol).map_or(0, PriceSeries::len),
                })
                .collect(),
            statistics: portfolio.statistics(config.risk_free_rate, initial_value),
        },
        series: available
            .values()
            .map(|series| series.statistics(config.risk_free_rate))
            .collect(),
        cleaning,
        failures,
        simulations,
        report_path,
    };

    let data = serde_json::to_value(data)?;
    Ok(CommandResult::ok(data, markdown).with_warnings(warnings))
}

async fn fetch_series(
    config: &AnalysisConfig,
    generated_at: UtcDateTime,
) -> Result<(Vec<PriceSeries>, BTreeMap<Symbol, FailureData>), CliError> {
    let (start, end) = config.date_range(generated_at.date())?;
    let symbols = config.symbols()?;

    let timeout_ms = config.fetch.timeout_ms;
    let adapters: Vec<Arc<dyn PriceSource>> = vec![
        Arc::new(YahooAdapter::default().with_timeout_ms(timeout_ms)),
        Arc::new(AlphaVantageAdapter::default().with_timeout_ms(timeout_ms)),
    ];
    let mut registry = SourceRegistry::new(adapters, config.provider);
    for (symbol, provider) in config.symbol_overrides()? {
        registry = registry.with_override(symbol, provider);
    }

    let outcome = registry
        .fetch_many(&symbols, start, end, &config.fetch)
        .await;
    info!(
        fetched = outcome.series.len(),
        failed = outcome.failures.len(),
        "price histories ready"
    );

    let failures = outcome
        .failures
        .into_iter()
        .map(|(symbol, error)| {
            let failure = FailureData {
                code: error.code(),
                message: error.message().to_owned(),
                retryable: error.retryable(),
            };
            (symbol, failure)
        })
        .collect();
    Ok((outcome.series.into_values().collect(), failures))
}

fn load_series_files(paths: &[PathBuf]) -> Result<Vec<PriceSeries>, CliError> {
    paths
        .iter()
        .map(|path| {
            let raw = std::fs::read_to_string(path)?;
            let series: PriceSeries = serde_json::from_str(&raw)?;
            info!(symbol = %series.symbol(), points = series.len(), path = %path.display(), "loaded series file");
            Ok(series)
        })
        .collect()
}

/// Holds every loaded series that has a configured weight.
fn build_portfolio(
    config: &AnalysisConfig,
    available: &BTreeMap<Symbol, PriceSeries>,
    warnings: &mut Vec<String>,
) -> Result<Portfolio, CliError> {
    let mut portfolio = Portfolio::new(config.portfolio_name.clone())?;
    for (symbol, series) in available {
        match config.weight_for(symbol) {
            Some(weight) => portfolio.add_holding(series.clone(), weight)?,
            None => warn!(symbol = %symbol, "no weight configured, kept out of the portfolio"),
        }
    }
    if portfolio.is_empty() {
        warnings.push(String::from("portfolio has no holdings with data"));
    }
    Ok(portfolio)
}

#[allow(clippy::too_many_arguments)]
fn simulate(
    mode: &SimulationMode,
    portfolio: &Portfolio,
    available: &BTreeMap<Symbol, PriceSeries>,
    params: &SimulationParams,
    initial_value: f64,
    with_trajectories: bool,
    rng: &mut StdRng,
    warnings: &mut Vec<String>,
) -> Vec<SimulationRun> {
    let mut runs = Vec::new();

    let targets: Vec<&str> = match mode {
        SimulationMode::Portfolio => {
            match portfolio.monte_carlo(params, initial_value, rng) {
                Ok(result) => {
                    let trajectories = with_trajectories
                        .then(|| result.trajectories())
                        .and_then(|set| keep_trajectories(set, portfolio.name(), warnings));
                    runs.push(SimulationRun::Portfolio {
                        name: portfolio.name().to_owned(),
                        result,
                        trajectories,
                    });
                }
                Err(error) => warnings.push(format!("portfolio simulation skipped: {error}")),
            }
            return runs;
        }
        SimulationMode::Single { symbol } => vec![symbol.as_str()],
        SimulationMode::Selection { symbols } => symbols.iter().map(String::as_str).collect(),
        SimulationMode::AllHoldings => {
            let held: Vec<&PriceSeries> = portfolio.price_series().collect();
            for series in held {
                simulate_series(series, params, with_trajectories, rng, warnings, &mut runs);
            }
            return runs;
        }
    };

    for name in targets {
        let series = config::resolve_name(name).and_then(|symbol| available.get(&symbol));
        match series {
            Some(series) => {
                simulate_series(series, params, with_trajectories, rng, warnings, &mut runs)
            }
            None => warnings.push(format!("{name}: no price data to simulate")),
        }
    }
    runs
}

fn simulate_series(
    series: &PriceSeries,
    params: &SimulationParams,
    with_trajectories: bool,
    rng: &mut StdRng,
    warnings: &mut Vec<String>,
    runs: &mut Vec<SimulationRun>,
) {
    let symbol = series.symbol().clone();
    match simulate_price(series, params, None, rng) {
        Ok(result) => {
            let trajectories = with_trajectories
                .then(|| result.trajectories())
                .and_then(|set| keep_trajectories(set, symbol.as_str(), warnings));
            runs.push(SimulationRun::Price {
                symbol,
                result,
                trajectories,
            });
        }
        Err(error) => warnings.push(format!("{symbol}: simulation skipped: {error}")),
    }
}

fn keep_trajectories<T>(
    set: Result<T, ferrocast_core::AnalysisError>,
    label: &str,
    warnings: &mut Vec<String>,
) -> Option<T> {
    match set {
        Ok(set) => Some(set),
        Err(error) => {
            warnings.push(format!("{label}: trajectories unavailable: {error}"));
            None
        }
    }
}

fn write_report(path: &Path, markdown: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, markdown)?;
    info!(path = %path.display(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use ferrocast_core::{PricePoint, Symbol};
    use time::macros::date;
    use time::Duration;

    use super::*;

    fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
        let first = date!(2024 - 01 - 01);
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let day = UtcDateTime::from_date(first + Duration::days(i as i64));
                PricePoint::new(day, *close, *close, *close, *close, Some(1_000)).expect("point")
            })
            .collect();
        PriceSeries::new(Symbol::parse(symbol).expect("symbol"), points)
    }

    fn zigzag(base: f64) -> Vec<f64> {
        (0..60)
            .map(|i| base + if i % 2 == 0 { 1.0 } else { -1.0 } + i as f64 * 0.05)
            .collect()
    }

    #[tokio::test]
    async fn analyzes_series_files_end_to_end() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut files = Vec::new();
        for (symbol, base) in [("AAPL", 100.0), ("MSFT", 200.0)] {
            let path = dir.path().join(format!("{symbol}.json"));
            let json = serde_json::to_string(&series(symbol, &zigzag(base))).expect("json");
            std::fs::write(&path, json).expect("write series");
            files.push(path);
        }
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{"tickers": ["AAPL", "MSFT"], "indices": [], "weights": {"AAPL": 0.5, "MSFT": 0.5},
                "simulation": {"simulation_count": 50, "horizon_days": 5}}"#,
        )
        .expect("write config");
        let report_path = dir.path().join("out").join("report.md");

        let args = AnalyzeArgs {
            config: Some(config_path),
            series_files: files,
            seed: Some(11),
            output: Some(report_path.clone()),
            trajectories: true,
        };
        let generated_at = UtcDateTime::parse("2024-04-01T00:00:00Z").expect("ts");
        let result = run(&args, generated_at).await.expect("analysis runs");

        assert_eq!(result.data["portfolio"]["holdings"].as_array().map(Vec::len), Some(2));
        assert_eq!(result.data["simulations"][0]["kind"], "portfolio");
        assert!(result.data["simulations"][0]["trajectories"].is_object());
        assert!(result.markdown.contains("## Monte Carlo Simulation"));
        let written = std::fs::read_to_string(report_path).expect("report written");
        assert_eq!(written, result.markdown);
    }

    #[test]
    fn single_mode_warns_about_missing_symbols() {
        let mut available = BTreeMap::new();
        let aapl = series("AAPL", &zigzag(100.0));
        available.insert(aapl.symbol().clone(), aapl);
        let portfolio = Portfolio::new("Test").expect("portfolio");
        let params = SimulationParams::new(5, 20, vec![0.5]).with_seed(3);
        let mut rng = params.rng();
        let mut warnings = Vec::new();

        let runs = simulate(
            &SimulationMode::Selection {
                symbols: vec![String::from("aapl"), String::from("ZZZ")],
            },
            &portfolio,
            &available,
            &params,
            10_000.0,
            false,
            &mut rng,
            &mut warnings,
        );

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].label(), "AAPL");
        assert_eq!(warnings, vec![String::from("ZZZ: no price data to simulate")]);
    }
}
