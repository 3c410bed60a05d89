//! Closed-form percentile paths for the two projection models.
//!
//! Price model: `P0 * exp(mu * t + sigma * sqrt(t) * z)`.
//! Portfolio model: `V0 * (1 + mu)^t + z * V0 * sigma * sqrt(t)`.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::function::erf::erf_inv;

use crate::AnalysisError;

/// Levels always present in a reconstructed set.
const TAIL_LEVELS: [f64; 2] = [0.01, 0.99];
const LEVEL_TOLERANCE: f64 = 1e-9;

/// Inverse standard-normal CDF.
pub fn z_score(level: f64) -> Result<f64, AnalysisError> {
    check_level(level)?;
    let standard = Normal::new(0.0, 1.0)
        .map_err(|err| AnalysisError::invalid_parameter(err.to_string()))?;
    Ok(standard.inverse_cdf(level))
}

/// `sqrt(2) * erf_inv(2p - 1)`; matches [`z_score`].
pub fn z_score_from_erf(level: f64) -> Result<f64, AnalysisError> {
    check_level(level)?;
    Ok(std::f64::consts::SQRT_2 * erf_inv(2.0 * level - 1.0))
}

fn check_level(level: f64) -> Result<(), AnalysisError> {
    if level.is_finite() && level > 0.0 && level < 1.0 {
        Ok(())
    } else {
        Err(AnalysisError::invalid_parameter(format!(
            "confidence level must be within (0, 1), got {level}"
        )))
    }
}

/// Path of one percentile; `values[t]` is day `t`, day 0 is the start value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileTrajectory {
    pub level: f64,
    pub percent: u32,
    pub z_score: f64,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySet {
    pub horizon_days: usize,
    /// Median path (`z = 0`).
    pub expected: Vec<f64>,
    pub percentiles: Vec<PercentileTrajectory>,
}

impl TrajectorySet {
    pub fn get(&self, percent: u32) -> Option<&PercentileTrajectory> {
        self.percentiles
            .iter()
            .rev()
            .find(|trajectory| trajectory.percent == percent)
    }
}

/// Requested levels plus the 1% and 99% tails, ascending.
pub fn with_tail_levels(levels: &[f64]) -> Vec<f64> {
    let mut augmented = levels.to_vec();
    for tail in TAIL_LEVELS {
        if !augmented
            .iter()
            .any(|level| (level - tail).abs() < LEVEL_TOLERANCE)
        {
            augmented.push(tail);
        }
    }
    augmented.sort_by(f64::total_cmp);
    augmented
}

pub fn price_trajectories(
    initial_price: f64,
    mean_log_return: f64,
    stdev_log_return: f64,
    horizon_days: usize,
    levels: &[f64],
) -> Result<TrajectorySet, AnalysisError> {
    build(initial_price, horizon_days, levels, |t, z| {
        initial_price * (mean_log_return * t + stdev_log_return * t.sqrt() * z).exp()
    })
}

pub fn portfolio_trajectories(
    initial_value: f64,
    mean_return: f64,
    stdev_return: f64,
    horizon_days: usize,
    levels: &[f64],
) -> Result<TrajectorySet, AnalysisError> {
    build(initial_value, horizon_days, levels, |t, z| {
        initial_value * (1.0 + mean_return).powf(t) + z * initial_value * stdev_return * t.sqrt()
    })
}

fn build<F>(
    start: f64,
    horizon_days: usize,
    levels: &[f64],
    value_at: F,
) -> Result<TrajectorySet, AnalysisError>
where
    F: Fn(f64, f64) -> f64,
{
    let path = |z: f64| -> Vec<f64> {
        (0..=horizon_days)
            .map(|day| if day == 0 { start } else { value_at(day as f64, z) })
            .collect()
    };

    let percentiles = with_tail_levels(levels)
        .into_iter()
        .map(|level| {
            let z = z_score(level)?;
            Ok(PercentileTrajectory {
                level,
                percent: percent_label(level),
                z_score: z,
                values: path(z),
            })
        })
        .collect::<Result<Vec<_>, AnalysisError>>()?;

    Ok(TrajectorySet {
        horizon_days,
        expected: path(0.0),
        percentiles,
    })
}

/// Rounded integer percent used to label a level (`0.05` -> `5`).
pub fn percent_label(level: f64) -> u32 {
    (level * 100.0).round() as u32
}
