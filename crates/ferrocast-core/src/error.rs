use thiserror::Error;

/// Validation and contract errors exposed by `ferrocast-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter, digit or '^': '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid source '{value}', expected one of yahoo, alphavantage")]
    InvalidSource { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("unix timestamp {value} is out of range")]
    TimestampOutOfRange { value: i64 },

    #[error("currency must be a 3-letter uppercase ISO code: '{value}'")]
    InvalidCurrency { value: String },

    #[error("price point high must be >= low")]
    InvalidBarRange,
    #[error("price point {field} must be within high/low range")]
    InvalidBarBounds { field: &'static str },

    #[error("weight for '{symbol}' must be within [0, 1], got {weight}")]
    InvalidWeight { symbol: String, weight: f64 },
    #[error("confidence level must be within (0, 1), got {value}")]
    InvalidConfidenceLevel { value: f64 },
    #[error("portfolio name cannot be empty")]
    EmptyPortfolioName,
}

/// Failures of statistics and simulation computations.
///
/// Cleaning never produces these; it degrades to an empty series instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("insufficient data: {reason}")]
    InsufficientData { reason: &'static str },
    #[error("no overlapping dates across portfolio holdings")]
    NoOverlappingDates,
    #[error("degenerate variance: return standard deviation is {stdev}")]
    DegenerateVariance { stdev: f64 },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl AnalysisError {
    pub const fn insufficient(reason: &'static str) -> Self {
        Self::InsufficientData { reason }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
