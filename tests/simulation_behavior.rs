//! Behaviour tests for the Monte Carlo engines and percentile trajectories.

use ferrocast_core::{
    simulate_price, AnalysisError, Portfolio, PricePoint, PriceSeries, SimulationParams, Symbol,
    UtcDateTime,
};
use time::macros::date;
use time::Duration;

/// Closes drifting upward: log returns alternate between 0.02 and 0.0.
fn trending_series(symbol: &str, days: i64) -> PriceSeries {
    drifting_series(symbol, days, 0.01)
}

/// Log returns alternate between `2 * slope` and 0.0 around a fixed wobble.
fn drifting_series(symbol: &str, days: i64, slope: f64) -> PriceSeries {
    let points = (0..days)
        .map(|day| {
            let wobble = if day % 2 == 0 { 0.005 } else { -0.005 };
            let close = 100.0 * (slope * day as f64 + wobble).exp();
            let ts = UtcDateTime::from_date(date!(2024 - 01 - 01) + Duration::days(day));
            PricePoint::new(ts, close, close, close, close, None).expect("valid point")
        })
        .collect();
    PriceSeries::new(Symbol::parse(symbol).expect("symbol"), points)
}

fn flat_series(symbol: &str) -> PriceSeries {
    let points = (0..10)
        .map(|day| {
            let ts = UtcDateTime::from_date(date!(2024 - 01 - 01) + Duration::days(day));
            PricePoint::new(ts, 20.0, 20.0, 20.0, 20.0, None).expect("valid point")
        })
        .collect();
    PriceSeries::new(Symbol::parse(symbol).expect("symbol"), points)
}

fn params() -> SimulationParams {
    SimulationParams::new(20, 500, vec![0.05, 0.25, 0.5, 0.75, 0.95]).with_seed(42)
}

// =============================================================================
// Single instrument
// =============================================================================

#[test]
fn same_seed_reproduces_the_same_outcomes() {
    // Given: one series and a seeded parameter set
    let series = trending_series("AAA", 60);
    let params = params();

    // When: the simulation runs twice with fresh generators from the seed
    let first = simulate_price(&series, &params, None, &mut params.rng()).expect("first run");
    let second = simulate_price(&series, &params, None, &mut params.rng()).expect("second run");

    // Then: every outcome matches
    assert_eq!(first.terminal_values, second.terminal_values);
    assert_eq!(first.percentiles, second.percentiles);
}

#[test]
fn positive_drift_lifts_the_median_above_the_start() {
    // Given: a series with clearly positive mean log return
    let series = trending_series("UP", 60);
    let params = params();

    // When: it is simulated
    let result = simulate_price(&series, &params, None, &mut params.rng()).expect("simulation");

    // Then: the median and the expected return are above the start
    let median = result.get(50).expect("median");
    assert!(median > result.initial_price);
    assert!(result.expected_return > 0.0);
}

#[test]
fn negative_drift_pulls_the_mean_below_the_start() {
    // Given: a series losing about 1% a day
    let series = drifting_series("DOWN", 60, -0.01);
    let params = params();

    // When: it is simulated
    let result = simulate_price(&series, &params, None, &mut params.rng()).expect("simulation");

    // Then: the average outcome ends below the starting price
    assert!(result.mean_log_return < 0.0);
    assert!(result.mean_terminal < result.initial_price);
    assert!(result.expected_return < 0.0);
}

#[test]
fn percentiles_are_ordered_by_level() {
    // Given: a simulated series
    let series = trending_series("ORD", 60);
    let params = params();
    let result = simulate_price(&series, &params, None, &mut params.rng()).expect("simulation");

    // Then: values rise with the level and stay within the observed range
    let values: Vec<f64> = result.percentiles.iter().map(|p| p.value).collect();
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(result.min_terminal <= values[0]);
    assert!(values[values.len() - 1] <= result.max_terminal);
}

#[test]
fn flat_history_is_reported_as_degenerate() {
    // Given: closes that never move
    let series = flat_series("FLAT");
    let params = params();

    // When: it is simulated
    let error = simulate_price(&series, &params, None, &mut params.rng()).expect_err("must fail");

    // Then: the zero deviation is named
    assert_eq!(error, AnalysisError::DegenerateVariance { stdev: 0.0 });
}

#[test]
fn single_point_history_is_insufficient() {
    let series = PriceSeries::new(
        Symbol::parse("ONE").expect("symbol"),
        vec![PricePoint::new(UtcDateTime::from_date(date!(2024 - 01 - 01)), 1.0, 1.0, 1.0, 1.0, None)
            .expect("point")],
    );
    let params = params();
    let error = simulate_price(&series, &params, None, &mut params.rng()).expect_err("must fail");
    assert!(matches!(error, AnalysisError::InsufficientData { .. }));
}

// =============================================================================
// Portfolio
// =============================================================================

#[test]
fn portfolio_percentiles_are_ordered_and_reproducible() {
    // Given: a two-holding portfolio
    let mut portfolio = Portfolio::new("Pair").expect("portfolio");
    portfolio.add_holding(trending_series("AAA", 60), 0.5).expect("holding");
    portfolio.add_holding(trending_series("BBB", 60), 0.5).expect("holding");
    let params = params();

    // When: it is simulated twice with the same seed
    let first = portfolio
        .monte_carlo(&params, 10_000.0, &mut params.rng())
        .expect("simulation");
    let second = portfolio
        .monte_carlo(&params, 10_000.0, &mut params.rng())
        .expect("simulation");

    // Then: the runs agree and the percentiles are ordered
    assert_eq!(first.percentiles, second.percentiles);
    let values: Vec<f64> = first.percentiles.iter().map(|p| p.value).collect();
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(first.get(50).expect("median") > 10_000.0);
}

#[test]
fn losing_portfolio_ends_below_its_initial_value() {
    // Given: two holdings that both decline
    let mut portfolio = Portfolio::new("Decline").expect("portfolio");
    portfolio.add_holding(drifting_series("AAA", 60, -0.01), 0.5).expect("holding");
    portfolio.add_holding(drifting_series("BBB", 60, -0.01), 0.5).expect("holding");
    let params = params();

    // When: it is simulated from 1,000
    let result = portfolio
        .monte_carlo(&params, 1_000.0, &mut params.rng())
        .expect("simulation");

    // Then: the mean terminal value is a loss
    assert!(result.mean_return < 0.0);
    assert!(result.mean_terminal < 1_000.0);
    assert!(result.get(50).expect("median") < 1_000.0);
}

#[test]
fn portfolio_of_flat_holdings_is_degenerate() {
    let mut portfolio = Portfolio::new("Flat").expect("portfolio");
    portfolio.add_holding(flat_series("FLAT"), 1.0).expect("holding");
    let params = params();

    let error = portfolio
        .monte_carlo(&params, 10_000.0, &mut params.rng())
        .expect_err("must fail");
    assert!(matches!(error, AnalysisError::DegenerateVariance { .. }));
}

#[test]
fn empty_portfolio_cannot_be_simulated() {
    let portfolio = Portfolio::new("Empty").expect("portfolio");
    let params = params();
    let error = portfolio
        .monte_carlo(&params, 10_000.0, &mut params.rng())
        .expect_err("must fail");
    assert!(matches!(error, AnalysisError::InsufficientData { .. }));
}

// =============================================================================
// Trajectories
// =============================================================================

#[test]
fn trajectories_include_tails_and_fan_out() {
    // Given: a finished single-instrument simulation
    let series = trending_series("FAN", 60);
    let params = params();
    let result = simulate_price(&series, &params, None, &mut params.rng()).expect("simulation");

    // When: trajectories are reconstructed
    let set = result.trajectories().expect("trajectories");

    // Then: the 1% and 99% tails are present and the fan widens over time
    let low = set.get(1).expect("p1");
    let high = set.get(99).expect("p99");
    assert_eq!(low.values.len(), params.horizon_days + 1);
    assert_eq!(low.values[0], result.initial_price);
    let last = params.horizon_days;
    assert!(high.values[last] - low.values[last] > high.values[1] - low.values[1]);
    assert!(set.get(5).expect("p5").values[last] < set.get(95).expect("p95").values[last]);
}
