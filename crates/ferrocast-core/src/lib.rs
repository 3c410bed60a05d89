//! # Ferrocast Core
//!
//! Price-history analysis and Monte Carlo projection for the Ferrocast
//! toolkit.
//!
//! ## Overview
//!
//! - **Validated domain models** for daily price points, series and portfolios
//! - **Series cleaning** (validity, duplicate dates, z-score outliers)
//! - **Return statistics** (log returns, annualised return/volatility, Sharpe, drawdown)
//! - **Monte Carlo engines** for single instruments and weighted portfolios
//! - **Percentile trajectories** reconstructed analytically from drift and volatility
//! - **Provider adapters** for Yahoo Finance and Alpha Vantage behind a common trait
//! - **Markdown reports** of portfolio composition, statistics and projections
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Yahoo, Alpha Vantage) |
//! | [`cleaning`] | Series cleaning pipeline |
//! | [`config`] | Run configuration with defaults |
//! | [`data_source`] | `PriceSource` trait and request/error types |
//! | [`domain`] | Domain models (PricePoint, PriceSeries, Portfolio) |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`indices`] | Market index catalog |
//! | [`report`] | Markdown report rendering |
//! | [`retry`] | Retry with backoff |
//! | [`routing`] | Provider selection and batch fetching |
//! | [`simulation`] | Monte Carlo engines |
//! | [`source`] | Provider identifiers |
//! | [`stats`] | Statistical helpers |
//! | [`throttling`] | Request pacing |
//! | [`trajectory`] | Percentile trajectory reconstruction |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ferrocast_core::{Portfolio, SimulationParams, SourceRegistry, Symbol};
//! use ferrocast_core::config::FetchSettings;
//! use time::macros::date;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = SourceRegistry::default();
//!     let symbol = Symbol::parse("AAPL")?;
//!     let mut series = registry
//!         .fetch(&symbol, date!(2024 - 01 - 01), date!(2024 - 12 - 31))
//!         .await?;
//!     series.clean(&Default::default());
//!
//!     let mut portfolio = Portfolio::new("Tech")?;
//!     portfolio.add_holding(series, 1.0)?;
//!
//!     let params = SimulationParams::new(252, 1_000, vec![0.05, 0.5, 0.95]).with_seed(42);
//!     let result = portfolio.monte_carlo(&params, 10_000.0, &mut params.rng())?;
//!     println!("median: {:?}", result.get(50));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Config   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Source Registry │────▶│ Price Source     │──▶ HTTP Client
//! └────────┬────────┘     │ (Yahoo / AV)     │    (reqwest/none)
//!          │              └──────────────────┘
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Cleaning        │────▶│ Portfolio        │
//! └─────────────────┘     └────────┬─────────┘
//!                                  │
//!                                  ▼
//!                         ┌──────────────────┐
//!                         │ Simulation /     │
//!                         │ Trajectories     │
//!                         └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Computations return [`AnalysisError`]; constructors return
//! [`ValidationError`]; provider calls return [`SourceError`]:
//!
//! ```rust
//! use ferrocast_core::{SourceError, SourceErrorKind};
//!
//! fn handle_error(error: SourceError) {
//!     match error.kind() {
//!         SourceErrorKind::RateLimited => {
//!             // Wait and retry
//!         }
//!         SourceErrorKind::NotFound => {
//!             // Drop the symbol
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - The Alpha Vantage key is read from `ALPHA_VANTAGE_API_KEY` only and never serialized

pub mod adapters;
pub mod cleaning;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod indices;
pub mod report;
pub mod retry;
pub mod routing;
pub mod simulation;
pub mod source;
pub mod stats;
pub mod throttling;
pub mod trajectory;

// Adapter implementations
pub use adapters::{AlphaVantageAdapter, YahooAdapter};

// Cleaning
pub use cleaning::{CleanOptions, CleanReport};

// Configuration
pub use config::{AnalysisConfig, SimulationMode};

// Data source trait and types
pub use data_source::{HistoryRequest, PriceSource, SourceError, SourceErrorKind};

// Domain models
pub use domain::{
    Portfolio, PortfolioReturns, PortfolioStatistics, PricePoint, PriceSeries, SeriesStatistics,
    Symbol, UtcDateTime,
};

// Error types
pub use error::{AnalysisError, CoreError, ValidationError};

// HTTP client types
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient};

// Retry logic
pub use retry::{Backoff, RetryConfig};

// Routing types
pub use routing::{FetchOutcome, SourceRegistry};

// Simulation
pub use simulation::{
    simulate_portfolio, simulate_price, PercentileValue, PortfolioSimulation, PriceSimulation,
    SimulationParams, SimulationRun,
};

// Source identifiers
pub use source::ProviderId;

// Throttling
pub use throttling::RequestPacer;

// Trajectories
pub use trajectory::{PercentileTrajectory, TrajectorySet};
