//! Markdown rendering of portfolio analyses and simulation results.

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::config::ReportOptions;
use crate::simulation::{PercentileValue, SimulationRun};
use crate::{Portfolio, UtcDateTime};

const NOT_AVAILABLE: &str = "N/A";

/// Renders the portfolio report.
///
/// `initial_value` seeds the value series used for total return and
/// drawdown.
pub fn render_portfolio_report(
    portfolio: &Portfolio,
    options: &ReportOptions,
    risk_free_rate: f64,
    initial_value: f64,
    generated_at: UtcDateTime,
) -> String {
    let mut out = String::new();
    line(&mut out, format!("# Portfolio Report: {}", portfolio.name()));
    line(&mut out, String::new());
    line(&mut out, format!("**Generated at:** {generated_at}"));
    line(&mut out, String::new());

    render_composition(&mut out, portfolio, options);
    if options.include_statistics {
        render_portfolio_statistics(&mut out, portfolio, risk_free_rate, initial_value);
        render_holding_statistics(&mut out, portfolio, risk_free_rate);
    }
    if options.include_warnings {
        render_warnings(&mut out, portfolio);
    }
    out
}

/// Renders one subsection per simulation run.
pub fn render_simulation_section(runs: &[SimulationRun]) -> String {
    let mut out = String::new();
    if runs.is_empty() {
        return out;
    }
    line(&mut out, String::from("## Monte Carlo Simulation"));

    for run in runs {
        line(&mut out, String::new());
        line(&mut out, format!("### {}", run.label()));
        line(&mut out, String::new());
        match run {
            SimulationRun::Portfolio { result, .. } => {
                bullet(&mut out, "Simulations", result.simulation_count.to_string());
                bullet(&mut out, "Horizon (trading days)", result.horizon_days.to_string());
                bullet(&mut out, "Initial value", money(result.initial_value));
                bullet(&mut out, "Mean daily return", percent(result.mean_return, 4));
                bullet(&mut out, "Daily volatility", percent(result.stdev_return, 4));
                bullet(&mut out, "Mean final value", money(result.mean_terminal));
                bullet(&mut out, "Standard deviation", money(result.std_terminal));
                bullet(&mut out, "Minimum", money(result.min_terminal));
                bullet(&mut out, "Maximum", money(result.max_terminal));
                let expected = (result.mean_terminal - result.initial_value) / result.initial_value;
                bullet(&mut out, "Expected return", percent(expected, 2));
                render_percentiles(&mut out, &result.percentiles, result.initial_value);
            }
            SimulationRun::Price { result, .. } => {
                bullet(&mut out, "Simulations", result.simulation_count.to_string());
                bullet(&mut out, "Horizon (trading days)", result.horizon_days.to_string());
                bullet(&mut out, "Initial price", money(result.initial_price));
                bullet(&mut out, "Mean daily log return", percent(result.mean_log_return, 4));
                bullet(&mut out, "Daily volatility", percent(result.stdev_log_return, 4));
                bullet(&mut out, "Mean final price", money(result.mean_terminal));
                bullet(&mut out, "Standard deviation", money(result.std_terminal));
                bullet(&mut out, "Minimum", money(result.min_terminal));
                bullet(&mut out, "Maximum", money(result.max_terminal));
                bullet(&mut out, "Expected return", percent(result.expected_return, 2));
                render_percentiles(&mut out, &result.percentiles, result.initial_price);
            }
        }

        if let Some(set) = run.trajectories() {
            line(&mut out, String::new());
            line(
                &mut out,
                format!(
                    "Percentile trajectories over {} days: {}",
                    set.horizon_days,
                    set.percentiles
                        .iter()
                        .map(|t| format!("p{}", t.percent))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            );
        }
    }
    out
}

fn render_composition(out: &mut String, portfolio: &Portfolio, options: &ReportOptions) {
    line(out, String::from("## Composition"));
    line(out, String::new());
    line(out, String::from("| Symbol | Weight | Name |"));
    line(out, String::from("|--------|--------|------|"));
    for (symbol, weight) in portfolio.holdings() {
        let name = portfolio
            .series(symbol)
            .map_or(NOT_AVAILABLE, |series| series.name());
        line(out, format!("| {symbol} | {} | {name} |", percent(*weight, 2)));
    }

    let total = portfolio.total_weight();
    if options.include_warnings && (total - 1.0).abs() > 0.01 {
        line(out, String::new());
        line(
            out,
            format!(
                "> **Warning:** weights sum to {}, not 100%.",
                percent(total, 2)
            ),
        );
    }
}

fn render_portfolio_statistics(
    out: &mut String,
    portfolio: &Portfolio,
    risk_free_rate: f64,
    initial_value: f64,
) {
    let Some(stats) = portfolio.statistics(risk_free_rate, initial_value) else {
        return;
    };
    if stats.observations == 0 {
        return;
    }

    line(out, String::new());
    line(out, String::from("## Portfolio Statistics"));
    line(out, String::new());
    bullet(out, "Observations", stats.observations.to_string());
    bullet(out, "Mean daily return", optional(stats.mean_daily_return, |v| percent(v, 4)));
    bullet(out, "Daily volatility", optional(stats.stdev_daily_return, |v| percent(v, 4)));
    bullet(out, "Annualised return", optional(stats.annualized_return, |v| percent(v, 2)));
    bullet(
        out,
        "Annualised volatility",
        optional(stats.annualized_volatility, |v| percent(v, 2)),
    );
    if let Some(sharpe) = stats.sharpe_ratio {
        bullet(out, "Sharpe ratio", format!("{sharpe:.2}"));
    }

    if let (Some(start), Some(end)) = (stats.value_start, stats.value_end) {
        line(out, String::new());
        line(out, String::from("### Portfolio Value"));
        line(out, String::new());
        bullet(out, "Initial value", money(start));
        bullet(out, "Final value", money(end));
        bullet(out, "Total return", optional(stats.total_return, |v| percent(v, 2)));
        bullet(out, "Maximum drawdown", optional(stats.max_drawdown, |v| percent(v, 2)));
    }
}

fn render_holding_statistics(out: &mut String, portfolio: &Portfolio, risk_free_rate: f64) {
    line(out, String::new());
    line(out, String::from("## Holding Statistics"));
    line(out, String::new());
    line(
        out,
        String::from("| Symbol | Annualised Return | Volatility | Sharpe | Max Drawdown |"),
    );
    line(
        out,
        String::from("|--------|-------------------|------------|--------|--------------|"),
    );
    for series in portfolio.price_series() {
        let stats = series.statistics(risk_free_rate);
        line(
            out,
            format!(
                "| {} | {} | {} | {} | {} |",
                stats.symbol,
                optional(stats.annualized_return, |v| percent(v, 2)),
                optional(stats.annualized_volatility, |v| percent(v, 2)),
                optional(stats.sharpe_ratio, |v| format!("{v:.2}")),
                optional(stats.max_drawdown, |v| percent(v, 2)),
            ),
        );
    }
}

fn render_warnings(out: &mut String, portfolio: &Portfolio) {
    let mut warnings = Vec::new();
    for series in portfolio.price_series() {
        if series.is_empty() {
            warnings.push(format!("- **Error:** {}: no data available", series.symbol()));
        }
    }

    let periods: BTreeSet<_> = portfolio
        .price_series()
        .filter_map(|series| series.period())
        .collect();
    if periods.len() > 1 {
        warnings.push(String::from(
            "- **Warning:** holdings cover different data periods",
        ));
    }

    if warnings.is_empty() {
        return;
    }
    line(out, String::new());
    line(out, String::from("## Warnings"));
    line(out, String::new());
    for warning in warnings {
        line(out, warning);
    }
}

fn render_percentiles(out: &mut String, percentiles: &[PercentileValue], initial: f64) {
    if percentiles.is_empty() {
        return;
    }
    line(out, String::new());
    line(out, String::from("| Percentile | Value | Change |"));
    line(out, String::from("|------------|-------|--------|"));
    for p in percentiles {
        line(
            out,
            format!(
                "| p{} | {} | {} |",
                p.percent,
                money(p.value),
                percent((p.value - initial) / initial, 2)
            ),
        );
    }
}

fn line(out: &mut String, text: String) {
    let _ = writeln!(out, "{text}");
}

fn bullet(out: &mut String, label: &str, value: String) {
    line(out, format!("- **{label}:** {value}"));
}

fn optional(value: Option<f64>, render: impl Fn(f64) -> String) -> String {
    match value {
        Some(v) if v.is_finite() => render(v),
        _ => String::from(NOT_AVAILABLE),
    }
}

fn percent(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, value * 100.0)
}

/// `$1,234.56` style amount.
fn money(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{fraction}")
}

#[cfg(test)]
mod tests {
    use time::macros::date;
    use time::Duration;

    use super::*;
    use crate::{PricePoint, PriceSeries, Symbol};

    fn series(symbol: &str, closes: &[f64], first: time::Date) -> PriceSeries {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let day = first + Duration::days(i as i64);
                PricePoint::new(UtcDateTime::from_date(day), *close, *close, *close, *close, None)
                    .expect("valid point")
            })
            .collect();
        PriceSeries::new(Symbol::parse(symbol).expect("symbol"), points)
    }

    fn generated_at() -> UtcDateTime {
        UtcDateTime::parse("2024-02-01T12:00:00Z").expect("timestamp")
    }

    #[test]
    fn formats_money_with_grouping() {
        assert_eq!(money(1234567.891), "$1,234,567.89");
        assert_eq!(money(999.5), "$999.50");
        assert_eq!(money(-1000.0), "-$1,000.00");
    }

    #[test]
    fn renders_sections_for_a_full_portfolio() {
        let mut portfolio = Portfolio::new("Growth").expect("portfolio");
        let start = date!(2024 - 01 - 01);
        portfolio
            .add_holding(series("AAA", &[100.0, 110.0, 90.0, 95.0], start), 0.6)
            .expect("holding");
        portfolio
            .add_holding(series("BBB", &[50.0, 51.0, 52.0, 50.0], start), 0.4)
            .expect("holding");

        let report = render_portfolio_report(
            &portfolio,
            &ReportOptions::default(),
            0.02,
            10_000.0,
            generated_at(),
        );

        assert!(report.starts_with("# Portfolio Report: Growth"));
        assert!(report.contains("| AAA | 60.00% | AAA |"));
        assert!(report.contains("## Portfolio Statistics"));
        assert!(report.contains("- **Initial value:** $10,000.00"));
        assert!(report.contains("## Holding Statistics"));
        assert!(!report.contains("## Warnings"));
        assert!(!report.contains("weights sum to"));
    }

    #[test]
    fn flags_partial_weights_and_mismatched_periods() {
        let mut portfolio = Portfolio::new("Partial").expect("portfolio");
        portfolio
            .add_holding(series("AAA", &[100.0, 101.0, 102.0], date!(2024 - 01 - 01)), 0.3)
            .expect("holding");
        portfolio
            .add_holding(series("BBB", &[10.0], date!(2024 - 01 - 02)), 0.2)
            .expect("holding");

        let report = render_portfolio_report(
            &portfolio,
            &ReportOptions::default(),
            0.02,
            10_000.0,
            generated_at(),
        );

        assert!(report.contains("weights sum to 50.00%"));
        assert!(report.contains("| BBB | N/A | N/A | N/A |"));
        assert!(report.contains("holdings cover different data periods"));
    }

    #[test]
    fn omits_optional_sections() {
        let mut portfolio = Portfolio::new("Bare").expect("portfolio");
        portfolio
            .add_holding(series("AAA", &[1.0, 2.0], date!(2024 - 01 - 01)), 0.5)
            .expect("holding");
        let options = ReportOptions {
            include_statistics: false,
            include_warnings: false,
            ..ReportOptions::default()
        };

        let report = render_portfolio_report(&portfolio, &options, 0.02, 10_000.0, generated_at());
        assert!(!report.contains("Statistics"));
        assert!(!report.contains("Warning"));
    }

    #[test]
    fn renders_percentile_rows_for_simulations() {
        let closes: Vec<f64> = (0..40)
            .map(|i| 100.0 + if i % 2 == 0 { 1.0 } else { -1.0 } + i as f64 * 0.1)
            .collect();
        let source = series("AAA", &closes, date!(2024 - 01 - 01));
        let params = crate::simulation::SimulationParams::new(10, 200, vec![0.05, 0.5, 0.95]);
        let mut rng = params.clone().with_seed(7).rng();
        let result =
            crate::simulation::simulate_price(&source, &params, None, &mut rng).expect("simulation");
        let runs = vec![SimulationRun::Price {
            symbol: source.symbol().clone(),
            result,
            trajectories: None,
        }];

        let section = render_simulation_section(&runs);
        assert!(section.starts_with("## Monte Carlo Simulation"));
        assert!(section.contains("### AAA"));
        assert!(section.contains("| p5 |"));
        assert!(section.contains("| p95 |"));
        assert!(render_simulation_section(&[]).is_empty());
    }
}
