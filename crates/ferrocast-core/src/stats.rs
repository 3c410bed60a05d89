//! Plain numeric helpers shared by series statistics, the portfolio aggregator
//! and the Monte Carlo engines.
//!
//! Every function works on already-ordered slices and reports an undefined
//! result as `None` rather than `NaN`.

use serde::{Deserialize, Serialize};

/// Trading sessions per year used to annualize daily figures.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Calendar days per year used to annualize a dated span.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// `ln(v[i] / v[i-1])` for consecutive values.
pub fn log_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|pair| (pair[1] / pair[0]).ln())
        .collect()
}

/// `v[i] / v[i-1] - 1` for consecutive values.
pub fn simple_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation with divisor `n`.
pub fn population_std(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    Some(variance.sqrt())
}

/// Standard deviation with divisor `n - 1`; needs at least two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Largest peak-to-trough decline as a fraction of the running peak.
pub fn max_drawdown(values: &[f64]) -> Option<f64> {
    let first = *values.first()?;
    let mut peak = first;
    let mut worst = 0.0_f64;

    for &value in values {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let drawdown = (peak - value) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }

    Some(worst)
}

/// Empirical percentile of an ascending slice, interpolating linearly between
/// the two nearest order statistics.
pub fn percentile(sorted: &[f64], level: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&level) {
        return None;
    }

    let rank = level * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }

    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Moments and range of a sample of simulated outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl DistributionSummary {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mean = mean(values)?;
        let std = population_std(values)?;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            mean,
            std,
            min,
            max,
        })
    }
}
