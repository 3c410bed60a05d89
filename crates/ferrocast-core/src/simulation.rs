//! Monte Carlo projection engines.
//!
//! Single instruments follow a log-normal walk built from daily log-returns;
//! portfolios compound normally distributed simple returns. Both draw from a
//! caller-supplied [`rand::Rng`], so a seeded [`StdRng`] reproduces a run.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use tracing::debug;

use crate::domain::{PortfolioReturns, PriceSeries, Symbol};
use crate::stats::{self, DistributionSummary};
use crate::trajectory::{self, percent_label, TrajectorySet};
use crate::AnalysisError;

/// Shape of one projection run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub horizon_days: usize,
    pub simulation_count: usize,
    pub confidence_levels: Vec<f64>,
    pub seed: Option<u64>,
}

impl SimulationParams {
    pub fn new(horizon_days: usize, simulation_count: usize, confidence_levels: Vec<f64>) -> Self {
        Self {
            horizon_days,
            simulation_count,
            confidence_levels,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.horizon_days == 0 {
            return Err(AnalysisError::invalid_parameter(
                "horizon_days must be greater than zero",
            ));
        }
        if self.simulation_count == 0 {
            return Err(AnalysisError::invalid_parameter(
                "simulation_count must be greater than zero",
            ));
        }
        if let Some(level) = self
            .confidence_levels
            .iter()
            .find(|level| !(level.is_finite() && **level > 0.0 && **level < 1.0))
        {
            return Err(AnalysisError::invalid_parameter(format!(
                "confidence level must be within (0, 1), got {level}"
            )));
        }
        Ok(())
    }

    /// Generator seeded from `seed`, or from OS entropy when unset.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn sorted_levels(&self) -> Vec<f64> {
        let mut levels = self.confidence_levels.clone();
        levels.sort_by(f64::total_cmp);
        levels
    }
}

/// Empirical percentile of the simulated outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileValue {
    pub level: f64,
    /// Rounded integer percent, used as the `pNN` label.
    pub percent: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSimulation {
    pub simulation_count: usize,
    pub horizon_days: usize,
    pub initial_price: f64,
    pub mean_log_return: f64,
    pub stdev_log_return: f64,
    pub mean_terminal: f64,
    pub std_terminal: f64,
    pub min_terminal: f64,
    pub max_terminal: f64,
    /// `(mean_terminal - initial_price) / initial_price`.
    pub expected_return: f64,
    pub percentiles: Vec<PercentileValue>,
    #[serde(skip)]
    pub terminal_values: Vec<f64>,
}

impl PriceSimulation {
    /// Value for a percent label; on label collisions the highest level wins.
    pub fn get(&self, percent: u32) -> Option<f64> {
        lookup(&self.percentiles, percent)
    }

    pub fn trajectories(&self) -> Result<TrajectorySet, AnalysisError> {
        trajectory::price_trajectories(
            self.initial_price,
            self.mean_log_return,
            self.stdev_log_return,
            self.horizon_days,
            &levels_of(&self.percentiles),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSimulation {
    pub simulation_count: usize,
    pub horizon_days: usize,
    pub initial_value: f64,
    pub mean_return: f64,
    pub stdev_return: f64,
    pub mean_terminal: f64,
    pub std_terminal: f64,
    pub min_terminal: f64,
    pub max_terminal: f64,
    pub percentiles: Vec<PercentileValue>,
    #[serde(skip)]
    pub terminal_values: Vec<f64>,
}

impl PortfolioSimulation {
    pub fn get(&self, percent: u32) -> Option<f64> {
        lookup(&self.percentiles, percent)
    }

    pub fn trajectories(&self) -> Result<TrajectorySet, AnalysisError> {
        trajectory::portfolio_trajectories(
            self.initial_value,
            self.mean_return,
            self.stdev_return,
            self.horizon_days,
            &levels_of(&self.percentiles),
        )
    }
}

/// One finished projection, labelled by what was simulated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimulationRun {
    Portfolio {
        name: String,
        result: PortfolioSimulation,
        #[serde(skip_serializing_if = "Option::is_none")]
        trajectories: Option<TrajectorySet>,
    },
    Price {
        symbol: Symbol,
        result: PriceSimulation,
        #[serde(skip_serializing_if = "Option::is_none")]
        trajectories: Option<TrajectorySet>,
    },
}

impl SimulationRun {
    pub fn label(&self) -> String {
        match self {
            Self::Portfolio { name, .. } => name.clone(),
            Self::Price { symbol, .. } => symbol.to_string(),
        }
    }

    pub fn trajectories(&self) -> Option<&TrajectorySet> {
        match self {
            Self::Portfolio { trajectories, .. } | Self::Price { trajectories, .. } => {
                trajectories.as_ref()
            }
        }
    }
}

/// Projects terminal prices of `series`.
///
/// `initial_price` defaults to the latest close.
pub fn simulate_price<R>(
    series: &PriceSeries,
    params: &SimulationParams,
    initial_price: Option<f64>,
    rng: &mut R,
) -> Result<PriceSimulation, AnalysisError>
where
    R: Rng + ?Sized,
{
    if series.len() < 2 {
        return Err(AnalysisError::insufficient(
            "at least two price points required for simulation",
        ));
    }
    let (mean, stdev) = match (series.mean_log_return(), series.stdev_log_return()) {
        (Some(mean), Some(stdev)) => (mean, stdev),
        _ => return Err(AnalysisError::insufficient("log-return statistics undefined")),
    };
    params.validate()?;

    let initial = match initial_price.or_else(|| series.latest_close()) {
        Some(price) if price.is_finite() && price > 0.0 => price,
        other => {
            return Err(AnalysisError::invalid_parameter(format!(
                "initial price must be positive and finite, got {other:?}"
            )))
        }
    };
    if stdev == 0.0 || stdev.is_nan() {
        return Err(AnalysisError::DegenerateVariance { stdev });
    }

    let normal = Normal::new(mean, stdev)
        .map_err(|err| AnalysisError::invalid_parameter(err.to_string()))?;
    debug!(
        symbol = %series.symbol(),
        mean,
        stdev,
        initial,
        horizon_days = params.horizon_days,
        simulation_count = params.simulation_count,
        "simulating price paths"
    );

    let terminal_values: Vec<f64> = (0..params.simulation_count)
        .map(|_| {
            let total: f64 = (0..params.horizon_days).map(|_| normal.sample(rng)).sum();
            initial * total.exp()
        })
        .collect();

    let summary = summarize(&terminal_values)?;
    let percentiles = percentiles(&terminal_values, &params.sorted_levels());

    Ok(PriceSimulation {
        simulation_count: params.simulation_count,
        horizon_days: params.horizon_days,
        initial_price: initial,
        mean_log_return: mean,
        stdev_log_return: stdev,
        mean_terminal: summary.mean,
        std_terminal: summary.std,
        min_terminal: summary.min,
        max_terminal: summary.max,
        expected_return: (summary.mean - initial) / initial,
        percentiles,
        terminal_values,
    })
}

/// Projects terminal values of a portfolio from its aggregated daily returns.
pub fn simulate_portfolio<R>(
    returns: &PortfolioReturns,
    params: &SimulationParams,
    initial_value: f64,
    rng: &mut R,
) -> Result<PortfolioSimulation, AnalysisError>
where
    R: Rng + ?Sized,
{
    if returns.is_empty() {
        return Err(AnalysisError::insufficient(
            "no aggregated portfolio returns to simulate",
        ));
    }
    let (mean, stdev) = match (returns.mean(), returns.stdev()) {
        (Some(mean), Some(stdev)) => (mean, stdev),
        _ => {
            return Err(AnalysisError::insufficient(
                "at least two aggregated returns required for simulation",
            ))
        }
    };
    params.validate()?;

    if !(initial_value.is_finite() && initial_value > 0.0) {
        return Err(AnalysisError::invalid_parameter(format!(
            "initial value must be positive and finite, got {initial_value}"
        )));
    }
    if stdev == 0.0 || stdev.is_nan() {
        return Err(AnalysisError::DegenerateVariance { stdev });
    }

    let normal = Normal::new(mean, stdev)
        .map_err(|err| AnalysisError::invalid_parameter(err.to_string()))?;
    debug!(
        mean,
        stdev,
        initial_value,
        horizon_days = params.horizon_days,
        simulation_count = params.simulation_count,
        "simulating portfolio paths"
    );

    let terminal_values: Vec<f64> = (0..params.simulation_count)
        .map(|_| {
            let growth: f64 = (0..params.horizon_days)
                .map(|_| 1.0 + normal.sample(rng))
                .product();
            initial_value * growth
        })
        .collect();

    let summary = summarize(&terminal_values)?;
    let percentiles = percentiles(&terminal_values, &params.sorted_levels());

    Ok(PortfolioSimulation {
        simulation_count: params.simulation_count,
        horizon_days: params.horizon_days,
        initial_value,
        mean_return: mean,
        stdev_return: stdev,
        mean_terminal: summary.mean,
        std_terminal: summary.std,
        min_terminal: summary.min,
        max_terminal: summary.max,
        percentiles,
        terminal_values,
    })
}

fn summarize(values: &[f64]) -> Result<DistributionSummary, AnalysisError> {
    DistributionSummary::from_values(values)
        .ok_or(AnalysisError::insufficient("no simulated outcomes"))
}

fn percentiles(values: &[f64], levels: &[f64]) -> Vec<PercentileValue> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    levels
        .iter()
        .filter_map(|&level| {
            stats::percentile(&sorted, level).map(|value| PercentileValue {
                level,
                percent: percent_label(level),
                value,
            })
        })
        .collect()
}

fn lookup(percentiles: &[PercentileValue], percent: u32) -> Option<f64> {
    percentiles
        .iter()
        .rev()
        .find(|entry| entry.percent == percent)
        .map(|entry| entry.value)
}

fn levels_of(percentiles: &[PercentileValue]) -> Vec<f64> {
    percentiles.iter().map(|entry| entry.level).collect()
}
