//! Price-series cleaning: validity filter, same-day duplicate removal and
//! return-based outlier rejection.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{PricePoint, PriceSeries};
use crate::stats;

/// Switches and threshold for one cleaning pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleanOptions {
    pub remove_duplicates: bool,
    pub remove_outliers: bool,
    /// Allowed distance from the mean log-return, in standard deviations.
    pub outlier_threshold: f64,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self::new(true, true, 3.0)
    }
}

impl CleanOptions {
    pub fn new(remove_duplicates: bool, remove_outliers: bool, outlier_threshold: f64) -> Self {
        Self {
            remove_duplicates,
            remove_outliers,
            outlier_threshold,
        }
    }
}

/// What a cleaning pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    pub invalid_removed: usize,
    pub duplicates_removed: usize,
    pub outliers_removed: usize,
    /// Set when the outlier pass ran into a zero or undefined deviation.
    pub outlier_filter_skipped: bool,
    pub retained: usize,
}

impl CleanReport {
    pub fn total_removed(&self) -> usize {
        self.invalid_removed + self.duplicates_removed + self.outliers_removed
    }
}

/// Cleans `series` in place; its statistics reflect the retained points afterwards.
pub fn clean(series: &mut PriceSeries, options: &CleanOptions) -> CleanReport {
    let mut report = CleanReport::default();
    let symbol = series.symbol().clone();

    let mut points: Vec<PricePoint> = series
        .points()
        .iter()
        .filter(|point| point.is_tradeable())
        .cloned()
        .collect();
    report.invalid_removed = series.len() - points.len();
    if report.invalid_removed > 0 {
        warn!(
            symbol = %symbol,
            removed = report.invalid_removed,
            "dropped points with missing or non-positive prices"
        );
    }

    if points.is_empty() {
        series.replace_points(points);
        warn!(symbol = %symbol, "no valid points left after cleaning");
        return report;
    }

    if options.remove_duplicates || options.remove_outliers {
        points.sort_by_key(PricePoint::date);
    }

    if options.remove_duplicates {
        let before = points.len();
        points.dedup_by_key(|point| point.calendar_date());
        report.duplicates_removed = before - points.len();
        if report.duplicates_removed > 0 {
            warn!(
                symbol = %symbol,
                removed = report.duplicates_removed,
                "dropped same-day duplicate points"
            );
        }
    }

    if options.remove_outliers && points.len() > 2 {
        match reject_outliers(points, options.outlier_threshold) {
            Ok((kept, removed)) => {
                points = kept;
                report.outliers_removed = removed;
                if removed > 0 {
                    warn!(
                        symbol = %symbol,
                        removed,
                        threshold = options.outlier_threshold,
                        "dropped outlier returns"
                    );
                }
            }
            Err(kept) => {
                points = kept;
                report.outlier_filter_skipped = true;
                warn!(
                    symbol = %symbol,
                    "skipped outlier filter: return deviation is zero or undefined"
                );
            }
        }
    }

    report.retained = points.len();
    series.replace_points(points);
    info!(
        symbol = %symbol,
        retained = report.retained,
        removed = report.total_removed(),
        "cleaned price series"
    );
    report
}

/// Drops points whose return against the predecessor lies more than
/// `threshold` deviations from the mean. Mean and deviation come from the
/// full return set before any point is removed. Hands the points back
/// untouched in `Err` when the deviation is zero or `NaN`.
fn reject_outliers(
    points: Vec<PricePoint>,
    threshold: f64,
) -> Result<(Vec<PricePoint>, usize), Vec<PricePoint>> {
    let closes: Vec<f64> = points.iter().map(PricePoint::close).collect();
    let returns = stats::log_returns(&closes);
    let (mean, stdev) = match (stats::mean(&returns), stats::population_std(&returns)) {
        (Some(mean), Some(stdev)) if stdev != 0.0 && !stdev.is_nan() => (mean, stdev),
        _ => return Err(points),
    };

    let limit = threshold * stdev;
    let before = points.len();
    let kept: Vec<PricePoint> = points
        .into_iter()
        .enumerate()
        .filter(|(index, _)| *index == 0 || (returns[index - 1] - mean).abs() <= limit)
        .map(|(_, point)| point)
        .collect();
    let removed = before - kept.len();
    Ok((kept, removed))
}

impl PriceSeries {
    /// Convenience wrapper over [`clean`].
    pub fn clean(&mut self, options: &CleanOptions) -> CleanReport {
        clean(self, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Symbol, UtcDateTime};

    fn point(day: u32, close: f64) -> PricePoint {
        let ts = UtcDateTime::from_unix_timestamp(1_704_067_200 + i64::from(day) * 86_400)
            .expect("timestamp");
        PricePoint::new(ts, close, close, close, close, None).expect("valid point")
    }

    fn series(points: Vec<PricePoint>) -> PriceSeries {
        PriceSeries::new(Symbol::parse("TEST").expect("symbol"), points)
    }

    fn options() -> CleanOptions {
        CleanOptions::new(true, true, 3.0)
    }

    #[test]
    fn drops_non_finite_and_non_positive_points() {
        let mut series = series(vec![
            point(0, 100.0),
            point(1, f64::NAN),
            point(2, 0.0),
            point(3, -1.0),
            point(4, 101.0),
        ]);
        let report = series.clean(&CleanOptions::new(false, false, 3.0));
        assert_eq!(report.invalid_removed, 3);
        assert_eq!(report.retained, 2);
        assert_eq!(series.len(), 2);
        assert!(series.mean_log_return().is_some());
    }

    #[test]
    fn empty_after_validity_filter_leaves_statistics_undefined() {
        let mut series = series(vec![point(0, f64::NAN), point(1, 0.0)]);
        let report = series.clean(&options());
        assert_eq!(report.retained, 0);
        assert!(series.is_empty());
        assert_eq!(series.mean_log_return(), None);
        assert_eq!(series.stdev_log_return(), None);
    }

    #[test]
    fn keeps_first_of_same_day_duplicates_after_sorting() {
        let mut series = series(vec![point(1, 101.0), point(0, 100.0), point(1, 105.0)]);
        let report = series.clean(&CleanOptions::new(true, false, 3.0));
        assert_eq!(report.duplicates_removed, 1);
        let closes: Vec<f64> = series.points().iter().map(PricePoint::close).collect();
        assert_eq!(closes, vec![100.0, 101.0]);
    }

    #[test]
    fn skips_outlier_filter_on_zero_deviation() {
        let mut series = series((0..5).map(|day| point(day, 100.0)).collect());
        let report = series.clean(&options());
        assert!(report.outlier_filter_skipped);
        assert_eq!(report.retained, 5);
    }

    #[test]
    fn outlier_filter_needs_more_than_two_points() {
        let mut series = series(vec![point(0, 100.0), point(1, 1_000.0)]);
        let report = series.clean(&options());
        assert_eq!(report.outliers_removed, 0);
        assert!(!report.outlier_filter_skipped);
        assert_eq!(series.len(), 2);
    }
}
