use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::stats::{self, DAYS_PER_YEAR, TRADING_DAYS_PER_YEAR};
use crate::{AnalysisError, Symbol, UtcDateTime, ValidationError};

/// Daily OHLCV observation.
///
/// A value the provider did not report is stored as `NaN`; the cleaner removes
/// such points. Only the ordering of high/low against open/close is checked at
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PricePointRecord")]
pub struct PricePoint {
    date: UtcDateTime,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: Option<u64>,
}

impl PricePoint {
    pub fn new(
        date: UtcDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<u64>,
    ) -> Result<Self, ValidationError> {
        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }
        if open < low || open > high {
            return Err(ValidationError::InvalidBarBounds { field: "open" });
        }
        if close < low || close > high {
            return Err(ValidationError::InvalidBarBounds { field: "close" });
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    pub fn date(&self) -> UtcDateTime {
        self.date
    }

    pub fn calendar_date(&self) -> Date {
        self.date.date()
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn close(&self) -> f64 {
        self.close
    }

    pub fn volume(&self) -> Option<u64> {
        self.volume
    }

    /// True when every price is finite and strictly positive.
    pub fn is_tradeable(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|value| value.is_finite() && *value > 0.0)
    }
}

#[derive(Deserialize)]
struct PricePointRecord {
    date: UtcDateTime,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    #[serde(default)]
    volume: Option<u64>,
}

impl TryFrom<PricePointRecord> for PricePoint {
    type Error = ValidationError;

    fn try_from(value: PricePointRecord) -> Result<Self, Self::Error> {
        Self::new(
            value.date,
            value.open.unwrap_or(f64::NAN),
            value.high.unwrap_or(f64::NAN),
            value.low.unwrap_or(f64::NAN),
            value.close.unwrap_or(f64::NAN),
            value.volume,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ReturnStats {
    returns: Vec<f64>,
    mean: Option<f64>,
    stdev: Option<f64>,
}

impl ReturnStats {
    fn from_points(points: &[PricePoint]) -> Self {
        let closes: Vec<f64> = sorted_refs(points).iter().map(|p| p.close).collect();
        let returns = stats::log_returns(&closes);
        let mean = stats::mean(&returns);
        let stdev = stats::population_std(&returns);
        Self {
            returns,
            mean,
            stdev,
        }
    }
}

/// Price history for one instrument plus its cached log-return statistics.
///
/// Points may arrive in any order. Every mutation recomputes the statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PriceSeriesRecord")]
pub struct PriceSeries {
    symbol: Symbol,
    name: String,
    data: Vec<PricePoint>,
    source: String,
    currency: String,
    adjusted: bool,
    #[serde(skip)]
    stats: ReturnStats,
}

impl PriceSeries {
    pub fn new(symbol: Symbol, data: Vec<PricePoint>) -> Self {
        let stats = ReturnStats::from_points(&data);
        Self {
            name: symbol.as_str().to_owned(),
            symbol,
            data,
            source: String::from("unknown"),
            currency: String::from("USD"),
            adjusted: true,
            stats,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_currency(mut self, currency: &str) -> Result<Self, ValidationError> {
        self.currency = validate_currency_code(currency)?;
        Ok(self)
    }

    /// Marks whether closes are adjusted for splits and dividends.
    pub fn with_adjusted(mut self, adjusted: bool) -> Self {
        self.adjusted = adjusted;
        self
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_adjusted(&self) -> bool {
        self.adjusted
    }

    /// Points in insertion order.
    pub fn points(&self) -> &[PricePoint] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Points ordered by date; ties keep insertion order.
    pub fn sorted_points(&self) -> Vec<&PricePoint> {
        sorted_refs(&self.data)
    }

    pub fn push(&mut self, point: PricePoint) {
        self.data.push(point);
        self.refresh();
    }

    /// Keeps the points matching `keep` and returns how many were removed.
    pub fn retain_points<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&PricePoint) -> bool,
    {
        let before = self.data.len();
        self.data.retain(keep);
        self.refresh();
        before - self.data.len()
    }

    pub(crate) fn replace_points(&mut self, data: Vec<PricePoint>) {
        self.data = data;
        self.refresh();
    }

    fn refresh(&mut self) {
        self.stats = ReturnStats::from_points(&self.data);
    }

    /// Log-returns of chronologically ordered closes.
    pub fn log_returns(&self) -> &[f64] {
        &self.stats.returns
    }

    pub fn mean_log_return(&self) -> Option<f64> {
        self.stats.mean
    }

    /// Population standard deviation of the log-returns.
    pub fn stdev_log_return(&self) -> Option<f64> {
        self.stats.stdev
    }

    /// Earliest and latest observation dates.
    pub fn period(&self) -> Option<(UtcDateTime, UtcDateTime)> {
        let start = self.data.iter().map(PricePoint::date).min()?;
        let end = self.data.iter().map(PricePoint::date).max()?;
        Some((start, end))
    }

    /// Close of the most recent point by date.
    pub fn latest_close(&self) -> Option<f64> {
        self.sorted_points().last().map(|point| point.close)
    }

    /// Close on a calendar date; the last such point wins when several share it.
    pub fn close_on(&self, date: Date) -> Option<f64> {
        self.closes_by_date().get(&date).copied()
    }

    /// Close per calendar date, with the same tie rule as [`Self::close_on`].
    pub fn closes_by_date(&self) -> BTreeMap<Date, f64> {
        self.sorted_points()
            .into_iter()
            .map(|point| (point.calendar_date(), point.close))
            .collect()
    }

    /// `ln(last / first)` scaled to a year of 365.25 calendar days.
    pub fn annualized_return(&self) -> Result<f64, AnalysisError> {
        let sorted = self.sorted_points();
        let (first, last) = match (sorted.first(), sorted.last()) {
            (Some(first), Some(last)) if sorted.len() >= 2 => (*first, *last),
            _ => return Err(AnalysisError::insufficient("at least two price points required")),
        };

        let days = first.date.whole_days_until(last.date);
        if days <= 0 {
            return Err(AnalysisError::insufficient("price history spans zero days"));
        }

        let years = days as f64 / DAYS_PER_YEAR;
        Ok((last.close / first.close).ln() / years)
    }

    /// Daily stdev of log-returns, optionally scaled by `sqrt(252)`.
    pub fn volatility(&self, annualized: bool) -> Result<f64, AnalysisError> {
        let stdev = self
            .stats
            .stdev
            .ok_or(AnalysisError::insufficient("log-return deviation undefined"))?;
        if annualized {
            Ok(stdev * TRADING_DAYS_PER_YEAR.sqrt())
        } else {
            Ok(stdev)
        }
    }

    pub fn sharpe_ratio(&self, risk_free_rate: f64) -> Result<f64, AnalysisError> {
        let annual_return = self.annualized_return()?;
        let volatility = self.volatility(true)?;
        if volatility == 0.0 || volatility.is_nan() {
            return Err(AnalysisError::DegenerateVariance { stdev: volatility });
        }
        Ok((annual_return - risk_free_rate) / volatility)
    }

    /// Largest peak-to-trough decline of the closes, in `[0, 1]`.
    pub fn max_drawdown(&self) -> Option<f64> {
        let closes: Vec<f64> = self.sorted_points().iter().map(|p| p.close).collect();
        stats::max_drawdown(&closes)
    }

    pub fn statistics(&self, risk_free_rate: f64) -> SeriesStatistics {
        let period = self.period();
        SeriesStatistics {
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            points: self.data.len(),
            start: period.map(|(start, _)| start),
            end: period.map(|(_, end)| end),
            adjusted: self.adjusted,
            latest_close: self.latest_close(),
            mean_log_return: self.stats.mean,
            stdev_log_return: self.stats.stdev,
            annualized_return: self.annualized_return().ok(),
            annualized_volatility: self.volatility(true).ok(),
            sharpe_ratio: self.sharpe_ratio(risk_free_rate).ok(),
            max_drawdown: self.max_drawdown(),
        }
    }
}

/// Reporting snapshot of a series; undefined figures are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStatistics {
    pub symbol: Symbol,
    pub name: String,
    pub points: usize,
    pub start: Option<UtcDateTime>,
    pub end: Option<UtcDateTime>,
    pub adjusted: bool,
    pub latest_close: Option<f64>,
    pub mean_log_return: Option<f64>,
    pub stdev_log_return: Option<f64>,
    pub annualized_return: Option<f64>,
    pub annualized_volatility: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown: Option<f64>,
}

#[derive(Deserialize)]
struct PriceSeriesRecord {
    symbol: Symbol,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    data: Vec<PricePoint>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default = "default_adjusted")]
    adjusted: bool,
}

fn default_adjusted() -> bool {
    true
}

impl TryFrom<PriceSeriesRecord> for PriceSeries {
    type Error = ValidationError;

    fn try_from(value: PriceSeriesRecord) -> Result<Self, Self::Error> {
        let mut series = Self::new(value.symbol, value.data).with_adjusted(value.adjusted);
        if let Some(name) = value.name {
            series = series.with_name(name);
        }
        if let Some(source) = value.source {
            series = series.with_source(source);
        }
        if let Some(currency) = value.currency {
            series = series.with_currency(&currency)?;
        }
        Ok(series)
    }
}

/// Validate and normalize currency to uppercase 3-letter code.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_ascii_uppercase();
    let is_valid = normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());

    if !is_valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }

    Ok(normalized)
}

fn sorted_refs(points: &[PricePoint]) -> Vec<&PricePoint> {
    let mut sorted: Vec<&PricePoint> = points.iter().collect();
    sorted.sort_by_key(|point| point.date);
    sorted
}
