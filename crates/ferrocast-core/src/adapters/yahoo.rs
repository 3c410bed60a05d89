use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use time::Duration;
use tracing::{info, warn};

use crate::data_source::{HistoryRequest, PriceSource, SourceError};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::retry::RetryConfig;
use crate::{PricePoint, PriceSeries, ProviderId, Symbol, UtcDateTime};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Daily history from the Yahoo Finance chart endpoint.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    retry: RetryConfig,
    base_url: String,
    timeout_ms: u64,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::default()))
    }
}

impl YahooAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            retry: RetryConfig::default(),
            base_url: String::from(CHART_URL),
            timeout_ms: 15_000,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn chart_url(&self, req: &HistoryRequest) -> String {
        // period2 is exclusive on Yahoo's side; push it past the end date.
        let period1 = UtcDateTime::from_date(req.start).unix_timestamp();
        let period2 = UtcDateTime::from_date(req.end.saturating_add(Duration::DAY)).unix_timestamp();
        format!(
            "{}/{}?period1={period1}&period2={period2}&interval=1d&events=history&includeAdjustedClose=true",
            self.base_url,
            urlencoding::encode(req.symbol.as_str()),
        )
    }

    async fn fetch_chart(&self, url: &str) -> Result<String, SourceError> {
        let request = HttpRequest::get(url)
            .with_header("user-agent", BROWSER_USER_AGENT)
            .with_timeout_ms(self.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|e| {
            if e.retryable() {
                SourceError::unavailable(format!("yahoo transport error: {}", e.message()))
            } else {
                SourceError::internal(format!("yahoo transport error: {}", e.message()))
            }
        })?;

        if response.is_success() {
            return Ok(response.body);
        }
        match response.status {
            429 => Err(SourceError::rate_limited("yahoo rate limit reached")),
            404 => Err(SourceError::invalid_request("yahoo returned status 404")),
            status if self.retry.should_retry_status(status) => Err(SourceError::unavailable(
                format!("yahoo returned status {status}"),
            )),
            status => Err(SourceError::invalid_request(format!(
                "yahoo returned status {status}"
            ))),
        }
    }

    async fn fetch_history(&self, req: HistoryRequest) -> Result<PriceSeries, SourceError> {
        let url = self.chart_url(&req);
        info!(symbol = %req.symbol, start = %req.start, end = %req.end, "fetching yahoo history");

        let body = self
            .retry
            .run("yahoo.chart", |_| self.fetch_chart(&url))
            .await?;
        parse_chart(&req.symbol, &body)
    }
}

impl PriceSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch_history(req))
    }
}

/// Converts a chart payload into a raw series.
///
/// Adjusted closes are used when the payload carries at least one; the
/// other prices of a row are scaled by the same factor so the bar stays
/// consistent. Rows without an open or close are skipped.
fn parse_chart(symbol: &Symbol, body: &str) -> Result<PriceSeries, SourceError> {
    let response: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = response.chart.error {
        return Err(SourceError::invalid_request(format!(
            "yahoo chart error {}: {}",
            error.code, error.description
        )));
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| SourceError::not_found(symbol))?;

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjusted_closes: Vec<Option<f64>> = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|entry| entry.adjclose)
        .unwrap_or_default();
    let adjusted = adjusted_closes
        .iter()
        .any(|value| matches!(value, Some(v) if v.is_finite() && *v > 0.0));

    let mut points = Vec::with_capacity(timestamps.len());
    let mut rejected = 0usize;
    for (i, &ts) in timestamps.iter().enumerate() {
        let (Some(open), Some(close)) = (value_at(&quote.open, i), value_at(&quote.close, i))
        else {
            continue;
        };
        let high = value_at(&quote.high, i).unwrap_or(f64::NAN);
        let low = value_at(&quote.low, i).unwrap_or(f64::NAN);
        let volume = quote
            .volume
            .get(i)
            .copied()
            .flatten()
            .and_then(|v| u64::try_from(v).ok());

        let factor = match value_at(&adjusted_closes, i) {
            Some(adj) if adjusted && adj.is_finite() && adj > 0.0 && close > 0.0 => adj / close,
            _ => 1.0,
        };

        let date = UtcDateTime::from_unix_timestamp(ts)
            .map_err(|e| SourceError::internal(format!("invalid yahoo timestamp: {e}")))?;
        match PricePoint::new(
            date,
            open * factor,
            high * factor,
            low * factor,
            close * factor,
            volume,
        ) {
            Ok(point) => points.push(point),
            Err(_) => rejected += 1,
        }
    }

    if rejected > 0 {
        warn!(symbol = %symbol, rejected, "yahoo rows with inconsistent high/low skipped");
    }
    if !adjusted {
        warn!(symbol = %symbol, "yahoo returned no adjusted closes, using raw closes");
    }

    let meta = result.meta.unwrap_or_default();
    let name = meta
        .long_name
        .or(meta.short_name)
        .unwrap_or_else(|| symbol.to_string());
    let series = PriceSeries::new(symbol.clone(), points)
        .with_name(name)
        .with_source(ProviderId::Yahoo.as_str())
        .with_adjusted(adjusted);

    Ok(match meta.currency {
        Some(currency) => match series.clone().with_currency(&currency) {
            Ok(series) => series,
            Err(_) => {
                warn!(symbol = %symbol, currency = %currency, "unrecognised currency, keeping USD");
                series
            }
        },
        None => series,
    })
}

fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten()
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooChartError>,
}

#[derive(Debug, Deserialize)]
struct YahooChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    meta: Option<YahooChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooChartMeta {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
    #[serde(default)]
    adjclose: Vec<YahooAdjClose>,
}

#[derive(Debug, Default, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

#[derive(Debug, Deserialize)]
struct YahooAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}
