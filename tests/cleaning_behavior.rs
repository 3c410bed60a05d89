//! Behaviour tests for series cleaning: what survives a pass and what the
//! report says about it.

use ferrocast_core::{CleanOptions, PricePoint, PriceSeries, Symbol, UtcDateTime};
use time::macros::date;
use time::Duration;

fn point(day: i64, close: f64) -> PricePoint {
    let ts = UtcDateTime::from_date(date!(2024 - 01 - 01) + Duration::days(day));
    PricePoint::new(ts, close, close, close, close, Some(1_000)).expect("valid point")
}

fn series_with_spike() -> PriceSeries {
    let mut points: Vec<PricePoint> = (0..30)
        .map(|day| point(day, if day % 2 == 0 { 100.0 } else { 101.0 }))
        .collect();
    points.push(point(30, 1_000.0));
    PriceSeries::new(Symbol::parse("SPKE").expect("symbol"), points)
}

// =============================================================================
// Outliers
// =============================================================================

#[test]
fn spike_beyond_three_deviations_is_removed() {
    // Given: a calm series ending in a tenfold jump
    let mut series = series_with_spike();

    // When: it is cleaned with the default threshold of 3 deviations
    let report = series.clean(&CleanOptions::default());

    // Then: only the spike is dropped
    assert_eq!(report.outliers_removed, 1);
    assert_eq!(report.retained, 30);
    assert_eq!(series.latest_close(), Some(101.0));
}

#[test]
fn generous_threshold_keeps_the_spike() {
    // Given: the same series
    let mut series = series_with_spike();

    // When: the threshold is raised to 100 deviations
    let report = series.clean(&CleanOptions::new(true, true, 100.0));

    // Then: nothing is removed
    assert_eq!(report.total_removed(), 0);
    assert_eq!(series.len(), 31);
}

#[test]
fn second_pass_over_a_cleaned_series_removes_nothing() {
    // Given: a series cleaned once
    let mut series = series_with_spike();
    series.clean(&CleanOptions::default());
    let after_first = series.points().to_vec();

    // When: it is cleaned again
    let report = series.clean(&CleanOptions::default());

    // Then: the points are unchanged
    assert_eq!(report.total_removed(), 0);
    assert_eq!(series.points(), after_first.as_slice());
}

#[test]
fn extreme_spike_masks_smaller_jump_until_a_later_pass() {
    // Given: a calm series with a 30% jump at day 20 and a fiftyfold last close
    let mut points: Vec<PricePoint> = (0..40)
        .map(|day| {
            let close = match day {
                20 => 130.0,
                d if d % 2 == 0 => 100.0,
                _ => 101.0,
            };
            point(day, close)
        })
        .collect();
    points.push(point(40, 5_000.0));
    let mut series = PriceSeries::new(Symbol::parse("MASK").expect("symbol"), points);
    let options = CleanOptions::default();

    // When: the series is cleaned three times
    let first = series.clean(&options);
    let second = series.clean(&options);
    let third = series.clean(&options);

    // Then: the deviation inflated by the last close hides the jump on the
    // first pass; each pass judges against its own input
    assert_eq!(first.outliers_removed, 1);
    assert_eq!(second.outliers_removed, 2);
    assert_eq!(third.outliers_removed, 0);
    assert_eq!(series.len(), 38);
    assert_eq!(series.close_on(date!(2024 - 01 - 21)), None);
}

#[test]
fn flat_series_skips_the_outlier_filter() {
    // Given: a series whose closes never move
    let points = (0..5).map(|day| point(day, 50.0)).collect();
    let mut series = PriceSeries::new(Symbol::parse("FLAT").expect("symbol"), points);

    // When: it is cleaned
    let report = series.clean(&CleanOptions::default());

    // Then: the filter reports it was skipped and every point stays
    assert!(report.outlier_filter_skipped);
    assert_eq!(report.retained, 5);
}

// =============================================================================
// Duplicates and invalid points
// =============================================================================

#[test]
fn same_day_duplicates_keep_the_first_point() {
    // Given: two observations for the same day, in insertion order
    let points = vec![point(0, 10.0), point(1, 11.0), point(1, 12.0), point(2, 11.5)];
    let mut series = PriceSeries::new(Symbol::parse("DUPE").expect("symbol"), points);

    // When: duplicates are removed and outlier rejection is off
    let report = series.clean(&CleanOptions::new(true, false, 3.0));

    // Then: one point is gone and the first arrival survives
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(series.close_on(date!(2024 - 01 - 02)), Some(11.0));
}

#[test]
fn non_positive_prices_are_dropped_before_anything_else() {
    // Given: a series with a zero-price placeholder row
    let points = vec![point(0, 10.0), point(1, 0.0), point(2, 10.5)];
    let mut series = PriceSeries::new(Symbol::parse("ZERO").expect("symbol"), points);

    // When: it is cleaned
    let report = series.clean(&CleanOptions::default());

    // Then: the placeholder is counted as invalid
    assert_eq!(report.invalid_removed, 1);
    assert_eq!(series.len(), 2);
}

#[test]
fn series_without_valid_points_ends_empty() {
    // Given: only placeholder rows
    let points = vec![point(0, 0.0), point(1, 0.0)];
    let mut series = PriceSeries::new(Symbol::parse("NONE").expect("symbol"), points);

    // When: it is cleaned
    let report = series.clean(&CleanOptions::default());

    // Then: the series is empty and its statistics are undefined
    assert_eq!(report.invalid_removed, 2);
    assert!(series.is_empty());
    assert_eq!(series.mean_log_return(), None);
}
