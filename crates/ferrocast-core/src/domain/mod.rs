//! # Domain Models
//!
//! Validated market-data types and the portfolio aggregate.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PricePoint`] | Daily OHLCV observation |
//! | [`PriceSeries`] | Price history with cached log-return statistics |
//! | [`SeriesStatistics`] | Reporting snapshot of one series |
//! | [`Portfolio`] | Weighted holdings and their series |
//! | [`PortfolioReturns`] | Weighted returns over shared dates |
//! | [`PortfolioStatistics`] | Reporting snapshot of the aggregate |
//! | [`Symbol`] | Validated ticker or index symbol |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! ## Validation
//!
//! ```rust
//! use ferrocast_core::{PricePoint, UtcDateTime, ValidationError};
//!
//! let ts = UtcDateTime::parse("2024-01-02").unwrap();
//! assert!(PricePoint::new(ts, 100.0, 105.0, 95.0, 102.0, Some(1_000)).is_ok());
//!
//! let inverted = PricePoint::new(ts, 100.0, 95.0, 105.0, 102.0, None);
//! assert_eq!(inverted, Err(ValidationError::InvalidBarRange));
//! ```

mod portfolio;
mod price;
mod symbol;
mod timestamp;

pub use portfolio::{Portfolio, PortfolioReturns, PortfolioStatistics};
pub use price::{validate_currency_code, PricePoint, PriceSeries, SeriesStatistics};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;

use time::Date;

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");
