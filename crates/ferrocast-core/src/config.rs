//! Run configuration: what to fetch, how to clean it, how to weight and
//! project it.
//!
//! Every field has a default, so a JSON file only needs the keys it changes.
//! The Alpha Vantage key comes from `ALPHA_VANTAGE_API_KEY` and is never read
//! from or written to the file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use crate::cleaning::CleanOptions;
use crate::domain::iso_date;
use crate::simulation::SimulationParams;
use crate::{indices, CoreError, ProviderId, Symbol, ValidationError};

pub const ALPHA_VANTAGE_KEY_VAR: &str = "ALPHA_VANTAGE_API_KEY";

/// What the Monte Carlo step projects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimulationMode {
    /// The weighted portfolio as a whole.
    #[default]
    Portfolio,
    Single {
        symbol: String,
    },
    /// Every holding separately.
    AllHoldings,
    Selection {
        symbols: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningSettings {
    pub remove_duplicates: bool,
    pub remove_outliers: bool,
    pub outlier_threshold: f64,
}

impl Default for CleaningSettings {
    fn default() -> Self {
        Self {
            remove_duplicates: true,
            remove_outliers: true,
            outlier_threshold: 3.0,
        }
    }
}

impl CleaningSettings {
    pub fn options(&self) -> CleanOptions {
        CleanOptions::new(
            self.remove_duplicates,
            self.remove_outliers,
            self.outlier_threshold,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub horizon_days: usize,
    pub simulation_count: usize,
    pub initial_value: f64,
    pub confidence_levels: Vec<f64>,
    pub seed: Option<u64>,
    pub mode: SimulationMode,
    /// Also reconstruct percentile trajectories.
    pub include_trajectories: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            horizon_days: 252,
            simulation_count: 1_000,
            initial_value: 10_000.0,
            confidence_levels: vec![0.05, 0.25, 0.50, 0.75, 0.95],
            seed: None,
            mode: SimulationMode::Portfolio,
            include_trajectories: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub include_statistics: bool,
    pub include_warnings: bool,
    pub output_path: PathBuf,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_statistics: true,
            include_warnings: true,
            output_path: PathBuf::from("portfolio_report.md"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub parallel: bool,
    pub max_workers: usize,
    pub timeout_ms: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            parallel: true,
            max_workers: 5,
            timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub portfolio_name: String,
    pub tickers: Vec<String>,
    /// Index aliases (`sp500`) or caret symbols (`^GSPC`).
    pub indices: Vec<String>,
    pub weights: BTreeMap<String, f64>,
    #[serde(with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(with = "iso_date::option")]
    pub end_date: Option<Date>,
    pub provider: ProviderId,
    pub symbol_providers: BTreeMap<String, ProviderId>,
    pub cleaning: CleaningSettings,
    pub simulation: SimulationSettings,
    pub risk_free_rate: f64,
    pub report: ReportOptions,
    pub fetch: FetchSettings,
    #[serde(skip)]
    pub alpha_vantage_api_key: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let weights = [
            ("AAPL", 0.25),
            ("MSFT", 0.25),
            ("GOOGL", 0.20),
            ("AMZN", 0.10),
            ("TSLA", 0.10),
            ("^GSPC", 0.05),
            ("^IXIC", 0.05),
        ]
        .into_iter()
        .map(|(symbol, weight)| (symbol.to_owned(), weight))
        .collect();

        Self {
            portfolio_name: String::from("Analysis Portfolio"),
            tickers: ["AAPL", "MSFT", "GOOGL", "AMZN", "TSLA"]
                .into_iter()
                .map(String::from)
                .collect(),
            indices: ["sp500", "dow_jones", "nasdaq"]
                .into_iter()
                .map(String::from)
                .collect(),
            weights,
            start_date: None,
            end_date: None,
            provider: ProviderId::Yahoo,
            symbol_providers: BTreeMap::new(),
            cleaning: CleaningSettings::default(),
            simulation: SimulationSettings::default(),
            risk_free_rate: 0.02,
            report: ReportOptions::default(),
            fetch: FetchSettings::default(),
            alpha_vantage_api_key: api_key_from_env(),
        }
    }
}

fn api_key_from_env() -> Option<String> {
    std::env::var(ALPHA_VANTAGE_KEY_VAR)
        .ok()
        .filter(|key| !key.trim().is_empty())
}

impl AnalysisConfig {
    pub fn from_json_str(input: &str) -> Result<Self, CoreError> {
        let mut config: Self = serde_json::from_str(input)?;
        config.alpha_vantage_api_key = api_key_from_env();
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Inclusive fetch window; defaults to the year ending `today`.
    pub fn date_range(&self, today: Date) -> Result<(Date, Date), CoreError> {
        let end = self.end_date.unwrap_or(today);
        let start = self
            .start_date
            .unwrap_or_else(|| end.saturating_sub(Duration::days(365)));
        if start > end {
            return Err(CoreError::Config(format!(
                "start_date {start} is after end_date {end}"
            )));
        }
        Ok((start, end))
    }

    pub fn ticker_symbols(&self) -> Result<Vec<Symbol>, ValidationError> {
        self.tickers.iter().map(|t| Symbol::parse(t)).collect()
    }

    /// Index aliases resolved to provider symbols; unknown aliases are skipped.
    pub fn index_symbols(&self) -> Vec<Symbol> {
        self.indices
            .iter()
            .filter_map(|name| indices::resolve_symbol(name))
            .collect()
    }

    /// Tickers then indices, without repeats.
    pub fn symbols(&self) -> Result<Vec<Symbol>, ValidationError> {
        let mut seen = BTreeSet::new();
        let mut symbols = Vec::new();
        for symbol in self.ticker_symbols()?.into_iter().chain(self.index_symbols()) {
            if seen.insert(symbol.clone()) {
                symbols.push(symbol);
            }
        }
        Ok(symbols)
    }

    /// Weight configured for `symbol`; keys may be symbols or index aliases.
    pub fn weight_for(&self, symbol: &Symbol) -> Option<f64> {
        self.weights
            .iter()
            .find(|(key, _)| resolve_name(key).as_ref() == Some(symbol))
            .map(|(_, weight)| *weight)
    }

    pub fn symbol_overrides(&self) -> Result<Vec<(Symbol, ProviderId)>, ValidationError> {
        self.symbol_providers
            .iter()
            .map(|(key, provider)| {
                let symbol = match resolve_name(key) {
                    Some(symbol) => symbol,
                    None => Symbol::parse(key)?,
                };
                Ok((symbol, *provider))
            })
            .collect()
    }

    pub fn uses_alpha_vantage(&self) -> bool {
        self.provider == ProviderId::Alphavantage
            || self
                .symbol_providers
                .values()
                .any(|provider| *provider == ProviderId::Alphavantage)
    }

    pub fn clean_options(&self) -> CleanOptions {
        self.cleaning.options()
    }

    /// Simulation shape; `seed` overrides the configured seed.
    pub fn simulation_params(&self, seed: Option<u64>) -> SimulationParams {
        SimulationParams {
            horizon_days: self.simulation.horizon_days,
            simulation_count: self.simulation.simulation_count,
            confidence_levels: self.simulation.confidence_levels.clone(),
            seed: seed.or(self.simulation.seed),
        }
    }

    /// Advisory findings; none of them stops a run.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let total: f64 = self.weights.values().sum();
        if total > 1.0 {
            warnings.push(format!(
                "portfolio weights sum to {:.2}%, they will be normalised to 100%",
                total * 100.0
            ));
        } else if total < 0.99 {
            warnings.push(format!(
                "portfolio weights sum to {:.2}%, below 99%: the portfolio is incomplete",
                total * 100.0
            ));
        }

        if self.tickers.is_empty() && self.indices.is_empty() {
            warnings.push(String::from("no tickers or indices configured to fetch"));
        }

        for name in &self.indices {
            if indices::resolve_symbol(name).is_none() {
                warnings.push(format!("unknown index '{name}' will be skipped"));
            }
        }

        if self.uses_alpha_vantage() && self.alpha_vantage_api_key.is_none() {
            warnings.push(format!(
                "Alpha Vantage is selected but {ALPHA_VANTAGE_KEY_VAR} is not set"
            ));
        }

        let configured = self.configured_symbols();
        match &self.simulation.mode {
            SimulationMode::Single { symbol } => {
                if !is_configured(&configured, symbol) {
                    warnings.push(format!(
                        "simulation symbol '{symbol}' is not among the configured tickers or indices"
                    ));
                }
            }
            SimulationMode::Selection { symbols } if symbols.is_empty() => {
                warnings.push(String::from("selection simulation has no symbols"));
            }
            SimulationMode::Selection { symbols } => {
                let missing: Vec<&str> = symbols
                    .iter()
                    .filter(|symbol| !is_configured(&configured, symbol))
                    .map(String::as_str)
                    .collect();
                if !missing.is_empty() {
                    warnings.push(format!(
                        "selection symbols not configured: {}",
                        missing.join(", ")
                    ));
                }
            }
            SimulationMode::Portfolio | SimulationMode::AllHoldings => {}
        }

        let unweighted: Vec<&str> = self
            .weights
            .keys()
            .filter(|key| !is_configured(&configured, key))
            .map(String::as_str)
            .collect();
        if !unweighted.is_empty() {
            warnings.push(format!(
                "weighted symbols missing from tickers and indices: {}",
                unweighted.join(", ")
            ));
        }

        warnings
    }

    /// Rejects settings no run can work with.
    pub fn validate_strict(&self) -> Result<(), CoreError> {
        if self.portfolio_name.trim().is_empty() {
            return Err(ValidationError::EmptyPortfolioName.into());
        }
        self.ticker_symbols()?;
        self.symbol_overrides()?;

        for (symbol, weight) in &self.weights {
            if !(weight.is_finite() && (0.0..=1.0).contains(weight)) {
                return Err(ValidationError::InvalidWeight {
                    symbol: symbol.clone(),
                    weight: *weight,
                }
                .into());
            }
        }

        let simulation = &self.simulation;
        if let Some(level) = simulation
            .confidence_levels
            .iter()
            .find(|level| !(level.is_finite() && **level > 0.0 && **level < 1.0))
        {
            return Err(ValidationError::InvalidConfidenceLevel { value: *level }.into());
        }
        if simulation.horizon_days == 0 {
            return Err(CoreError::Config(String::from(
                "simulation.horizon_days must be greater than zero",
            )));
        }
        if simulation.simulation_count == 0 {
            return Err(CoreError::Config(String::from(
                "simulation.simulation_count must be greater than zero",
            )));
        }
        if !(simulation.initial_value.is_finite() && simulation.initial_value > 0.0) {
            return Err(CoreError::Config(format!(
                "simulation.initial_value must be positive, got {}",
                simulation.initial_value
            )));
        }

        let threshold = self.cleaning.outlier_threshold;
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(CoreError::Config(format!(
                "cleaning.outlier_threshold must be non-negative, got {threshold}"
            )));
        }
        if self.fetch.max_workers == 0 {
            return Err(CoreError::Config(String::from(
                "fetch.max_workers must be greater than zero",
            )));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(CoreError::Config(format!(
                    "start_date {start} is after end_date {end}"
                )));
            }
        }
        Ok(())
    }

    fn configured_symbols(&self) -> BTreeSet<Symbol> {
        self.tickers
            .iter()
            .filter_map(|ticker| Symbol::parse(ticker).ok())
            .chain(self.index_symbols())
            .collect()
    }
}

/// Symbol named by a config entry: an index key (`dow_jones`), a ticker or
/// caret symbol, or an index display name.
pub fn resolve_name(name: &str) -> Option<Symbol> {
    let trimmed = name.trim();
    if let Some(info) = indices::catalog()
        .iter()
        .find(|info| info.key.eq_ignore_ascii_case(trimmed))
    {
        return Symbol::parse(info.symbol).ok();
    }
    Symbol::parse(trimmed)
        .ok()
        .or_else(|| indices::resolve_symbol(trimmed))
}

fn is_configured(configured: &BTreeSet<Symbol>, name: &str) -> bool {
    resolve_name(name).is_some_and(|symbol| configured.contains(&symbol))
}
