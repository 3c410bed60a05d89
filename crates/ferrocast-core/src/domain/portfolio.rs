use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::simulation::{self, PortfolioSimulation, SimulationParams};
use crate::stats::{self, TRADING_DAYS_PER_YEAR};
use crate::{AnalysisError, PriceSeries, Symbol, ValidationError};

/// Weighted set of holdings, each backed by its price history.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    name: String,
    holdings: BTreeMap<Symbol, f64>,
    price_series: BTreeMap<Symbol, PriceSeries>,
}

impl Portfolio {
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyPortfolioName);
        }
        Ok(Self {
            name,
            holdings: BTreeMap::new(),
            price_series: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds or replaces a holding keyed by the series symbol.
    ///
    /// When the weights then sum above 1.0 every weight is rescaled so they
    /// sum to exactly 1.0.
    pub fn add_holding(&mut self, series: PriceSeries, weight: f64) -> Result<(), ValidationError> {
        let symbol = series.symbol().clone();
        if !(weight.is_finite() && (0.0..=1.0).contains(&weight)) {
            return Err(ValidationError::InvalidWeight {
                symbol: symbol.to_string(),
                weight,
            });
        }

        self.holdings.insert(symbol.clone(), weight);
        self.price_series.insert(symbol, series);

        let total = self.total_weight();
        if total > 1.0 {
            for value in self.holdings.values_mut() {
                *value /= total;
            }
        }
        Ok(())
    }

    pub fn remove_holding(&mut self, symbol: &Symbol) -> Option<(f64, PriceSeries)> {
        let weight = self.holdings.remove(symbol)?;
        let series = self.price_series.remove(symbol)?;
        Some((weight, series))
    }

    pub fn holdings(&self) -> &BTreeMap<Symbol, f64> {
        &self.holdings
    }

    pub fn weight(&self, symbol: &Symbol) -> Option<f64> {
        self.holdings.get(symbol).copied()
    }

    pub fn series(&self, symbol: &Symbol) -> Option<&PriceSeries> {
        self.price_series.get(symbol)
    }

    pub fn price_series(&self) -> impl Iterator<Item = &PriceSeries> {
        self.price_series.values()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.holdings.values().sum()
    }

    /// Calendar dates present in every held series, ascending.
    pub fn common_dates(&self) -> Vec<Date> {
        let mut series = self.price_series.values();
        let Some(first) = series.next() else {
            return Vec::new();
        };

        let mut common: BTreeSet<Date> =
            first.points().iter().map(|point| point.calendar_date()).collect();
        for other in series {
            let dates: BTreeSet<Date> =
                other.points().iter().map(|point| point.calendar_date()).collect();
            common.retain(|date| dates.contains(date));
        }
        common.into_iter().collect()
    }

    /// Weighted daily simple returns over the dates shared by all holdings.
    ///
    /// `None` without holdings or without a shared date. Weights are used as
    /// stored, without renormalisation.
    pub fn aggregate_returns(&self) -> Option<PortfolioReturns> {
        if self.holdings.is_empty() {
            return None;
        }
        let dates = self.common_dates();
        if dates.is_empty() {
            return None;
        }

        let mut combined = vec![0.0; dates.len() - 1];
        for (symbol, weight) in &self.holdings {
            let by_date = self.price_series.get(symbol)?.closes_by_date();
            let closes: Vec<f64> = dates
                .iter()
                .map(|date| by_date.get(date).copied())
                .collect::<Option<_>>()?;
            for (slot, value) in combined.iter_mut().zip(stats::simple_returns(&closes)) {
                *slot += weight * value;
            }
        }

        Some(PortfolioReturns::new(dates[1..].to_vec(), combined))
    }

    pub fn statistics(&self, risk_free_rate: f64, initial_value: f64) -> Option<PortfolioStatistics> {
        let returns = self.aggregate_returns()?;
        Some(returns.statistics(risk_free_rate, initial_value))
    }

    /// Simulates the aggregated return series.
    pub fn monte_carlo<R>(
        &self,
        params: &SimulationParams,
        initial_value: f64,
        rng: &mut R,
    ) -> Result<PortfolioSimulation, AnalysisError>
    where
        R: Rng + ?Sized,
    {
        if self.holdings.is_empty() {
            return Err(AnalysisError::insufficient("portfolio has no holdings"));
        }
        let returns = self
            .aggregate_returns()
            .ok_or(AnalysisError::NoOverlappingDates)?;
        simulation::simulate_portfolio(&returns, params, initial_value, rng)
    }
}

/// Dated weighted returns of a portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioReturns {
    dates: Vec<Date>,
    returns: Vec<f64>,
}

impl PortfolioReturns {
    pub fn new(dates: Vec<Date>, returns: Vec<f64>) -> Self {
        Self { dates, returns }
    }

    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        stats::mean(&self.returns)
    }

    /// Sample standard deviation (divisor `n - 1`).
    pub fn stdev(&self) -> Option<f64> {
        stats::sample_std(&self.returns)
    }

    /// Compounded value path; the first entry is `initial_value`.
    pub fn value_series(&self, initial_value: f64) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.returns.len() + 1);
        let mut current = initial_value;
        values.push(current);
        for r in &self.returns {
            current *= 1.0 + r;
            values.push(current);
        }
        values
    }

    pub fn statistics(&self, risk_free_rate: f64, initial_value: f64) -> PortfolioStatistics {
        let mean = self.mean();
        let stdev = self.stdev();
        let annualized_return = mean.map(|m| m * TRADING_DAYS_PER_YEAR);
        let annualized_volatility = stdev.map(|s| s * TRADING_DAYS_PER_YEAR.sqrt());
        let sharpe_ratio = match (annualized_return, annualized_volatility) {
            (Some(ret), Some(vol)) if vol > 0.0 => Some((ret - risk_free_rate) / vol),
            _ => None,
        };

        let values = self.value_series(initial_value);
        let value_start = values.first().copied();
        let value_end = values.last().copied();
        let total_return = match (value_start, value_end) {
            (Some(start), Some(end)) if start != 0.0 => Some(end / start - 1.0),
            _ => None,
        };

        PortfolioStatistics {
            observations: self.returns.len(),
            start: self.dates.first().copied(),
            end: self.dates.last().copied(),
            mean_daily_return: mean,
            stdev_daily_return: stdev,
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
            value_start,
            value_end,
            total_return,
            max_drawdown: stats::max_drawdown(&values),
        }
    }
}

/// Reporting snapshot of the aggregated portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStatistics {
    pub observations: usize,
    #[serde(with = "crate::domain::iso_date::option")]
    pub start: Option<Date>,
    #[serde(with = "crate::domain::iso_date::option")]
    pub end: Option<Date>,
    pub mean_daily_return: Option<f64>,
    pub stdev_daily_return: Option<f64>,
    pub annualized_return: Option<f64>,
    pub annualized_volatility: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub value_start: Option<f64>,
    pub value_end: Option<f64>,
    pub total_return: Option<f64>,
    pub max_drawdown: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PricePoint, UtcDateTime};

    fn series(symbol: &str, closes: &[(u8, f64)]) -> PriceSeries {
        let points = closes
            .iter()
            .map(|&(day, close)| {
                let ts = UtcDateTime::parse(&format!("2024-02-{day:02}")).expect("date");
                PricePoint::new(ts, close, close, close, close, None).expect("point")
            })
            .collect();
        PriceSeries::new(Symbol::parse(symbol).expect("symbol"), points)
    }

    #[test]
    fn rejects_weights_outside_unit_interval() {
        let mut portfolio = Portfolio::new("Test").expect("portfolio");
        let err = portfolio
            .add_holding(series("AAA", &[(1, 1.0)]), 1.5)
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidWeight { .. }));
        assert!(portfolio
            .add_holding(series("AAA", &[(1, 1.0)]), f64::NAN)
            .is_err());
        assert!(portfolio.is_empty());
    }

    #[test]
    fn rejects_blank_name() {
        assert_eq!(
            Portfolio::new("  "),
            Err(ValidationError::EmptyPortfolioName)
        );
    }

    #[test]
    fn aggregates_over_shared_dates_only() {
        let mut portfolio = Portfolio::new("Test").expect("portfolio");
        portfolio
            .add_holding(series("AAA", &[(1, 100.0), (2, 110.0), (3, 121.0), (4, 50.0)]), 0.5)
            .expect("holding");
        portfolio
            .add_holding(series("BBB", &[(1, 10.0), (3, 12.0), (4, 12.0)]), 0.5)
            .expect("holding");

        let returns = portfolio.aggregate_returns().expect("aggregated");
        assert_eq!(returns.len(), 2);
        // Day 1 -> 3: AAA +21%, BBB +20%.
        assert!((returns.returns()[0] - 0.205).abs() < 1e-12);
        // Day 3 -> 4: AAA -58.68%, BBB flat.
        assert!((returns.returns()[1] - 0.5 * (50.0 / 121.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn disjoint_dates_aggregate_to_none() {
        let mut portfolio = Portfolio::new("Test").expect("portfolio");
        portfolio
            .add_holding(series("AAA", &[(1, 100.0), (2, 101.0)]), 0.5)
            .expect("holding");
        portfolio
            .add_holding(series("BBB", &[(3, 100.0), (4, 101.0)]), 0.5)
            .expect("holding");
        assert_eq!(portfolio.aggregate_returns(), None);

        let params = SimulationParams::new(5, 10, vec![0.5]).with_seed(1);
        assert!(matches!(
            portfolio.monte_carlo(&params, 1_000.0, &mut params.rng()),
            Err(AnalysisError::NoOverlappingDates)
        ));
    }

    #[test]
    fn value_series_compounds_from_initial_value() {
        let returns = PortfolioReturns::new(Vec::new(), vec![0.1, -0.5]);
        let values = returns.value_series(100.0);
        assert_eq!(values.len(), 3);
        assert!((values[2] - 55.0).abs() < 1e-9);
        let stats = returns.statistics(0.0, 100.0);
        assert!((stats.total_return.expect("defined") + 0.45).abs() < 1e-9);
        assert!((stats.max_drawdown.expect("defined") - 0.5).abs() < 1e-9);
    }
}
