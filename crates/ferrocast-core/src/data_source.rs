//! Provider contract for daily price history.
//!
//! Adapters implement [`PriceSource`]; the registry in [`crate::routing`]
//! picks one per symbol and collects the results.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use time::Date;

use crate::{PriceSeries, ProviderId, Symbol};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    NotFound,
    AdapterNotRegistered,
    Internal,
}

/// Structured fetch error; `retryable` drives the adapters' retry loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn not_found(symbol: &Symbol) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: format!("no price history returned for '{symbol}'"),
            retryable: false,
        }
    }

    pub fn adapter_not_registered(provider: ProviderId) -> Self {
        Self {
            kind: SourceErrorKind::AdapterNotRegistered,
            message: format!("source adapter '{provider}' is not registered"),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::AdapterNotRegistered => "source.adapter_not_registered",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Daily history for one symbol over an inclusive date window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub symbol: Symbol,
    pub start: Date,
    pub end: Date,
}

impl HistoryRequest {
    pub fn new(symbol: Symbol, start: Date, end: Date) -> Result<Self, SourceError> {
        if start > end {
            return Err(SourceError::invalid_request(format!(
                "history window starts after it ends ({start} > {end})"
            )));
        }
        Ok(Self { symbol, start, end })
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Source adapter contract.
///
/// Implementations must be `Send + Sync`; the registry shares them across
/// concurrent fetches.
pub trait PriceSource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Fetches raw, uncleaned daily history for the requested window.
    fn history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, SourceError>> + Send + 'a>>;
}
