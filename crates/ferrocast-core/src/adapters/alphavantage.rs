use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use crate::data_source::{HistoryRequest, PriceSource, SourceError};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::retry::RetryConfig;
use crate::throttling::RequestPacer;
use crate::{PricePoint, PriceSeries, ProviderId, UtcDateTime};

const QUERY_URL: &str = "https://www.alphavantage.co/query";
const FREE_TIER_CALLS_PER_MINUTE: u32 = 5;
/// Alpha Vantage's `compact` output covers roughly the last 100 sessions.
const COMPACT_WINDOW_DAYS: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DailyFunction {
    Adjusted,
    Raw,
}

impl DailyFunction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Adjusted => "TIME_SERIES_DAILY_ADJUSTED",
            Self::Raw => "TIME_SERIES_DAILY",
        }
    }
}

/// Daily history from Alpha Vantage, paced to the free-tier quota.
#[derive(Clone)]
pub struct AlphaVantageAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: Option<String>,
    pacer: RequestPacer,
    retry: RetryConfig,
    base_url: String,
    timeout_ms: u64,
}

impl Default for AlphaVantageAdapter {
    fn default() -> Self {
        Self::with_http_client(
            Arc::new(ReqwestHttpClient::default()),
            std::env::var("ALPHA_VANTAGE_API_KEY").ok(),
        )
    }
}

impl AlphaVantageAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            pacer: RequestPacer::per_minute(FREE_TIER_CALLS_PER_MINUTE),
            retry: RetryConfig::default(),
            base_url: String::from(QUERY_URL),
            timeout_ms: 10_000,
        }
    }

    pub fn with_pacer(mut self, pacer: RequestPacer) -> Self {
        self.pacer = pacer;
        self
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

    fn query_url(&self, function: DailyFunction, req: &HistoryRequest, api_key: &str) -> String {
        let today = OffsetDateTime::now_utc().date();
        let output_size = if (today - req.start).whole_days() > COMPACT_WINDOW_DAYS {
            "full"
        } else {
            "compact"
        };
        format!(
            "{}?function={}&symbol={}&apikey={}&outputsize={output_size}",
            self.base_url,
            function.as_str(),
            urlencoding::encode(req.symbol.as_str()),
            urlencoding::encode(api_key),
        )
    }

    async fn fetch_payload(&self, url: &str) -> Result<DailyPayload, SourceError> {
        self.pacer.acquire().await;
        let request = HttpRequest::get(url).with_timeout_ms(self.timeout_ms);
        let response = self.http_client.execute(request).await.map_err(|e| {
            if e.retryable() {
                SourceError::unavailable(format!("alphavantage transport error: {}", e.message()))
            } else {
                SourceError::internal(format!("alphavantage transport error: {}", e.message()))
            }
        })?;

        if !response.is_success() {
            return Err(if self.retry.should_retry_status(response.status) {
                SourceError::unavailable(format!("alphavantage returned status {}", response.status))
            } else {
                SourceError::invalid_request(format!(
                    "alphavantage returned status {}",
                    response.status
                ))
            });
        }

        let payload: DailyPayload = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::internal(format!("failed to parse alphavantage payload: {e}"))
        })?;
        payload.check()?;
        Ok(payload)
    }

    async fn fetch_function(
        &self,
        function: DailyFunction,
        req: &HistoryRequest,
        api_key: &str,
    ) -> Result<DailyPayload, SourceError> {
        let url = self.query_url(function, req, api_key);
        self.retry
            .run(function.as_str(), |_| self.fetch_payload(&url))
            .await
    }

    async fn fetch_history(&self, req: HistoryRequest) -> Result<PriceSeries, SourceError> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| SourceError::invalid_request("ALPHA_VANTAGE_API_KEY is not configured"))?;
        info!(symbol = %req.symbol, start = %req.start, end = %req.end, "fetching alphavantage history");

        let adjusted = self
            .fetch_function(DailyFunction::Adjusted, &req, &api_key)
            .await;
        let (payload, function) = match adjusted {
            Ok(payload) if payload.has_rows() => (payload, DailyFunction::Adjusted),
            outcome => {
                if let Err(error) = outcome {
                    warn!(symbol = %req.symbol, error = %error, "adjusted series unavailable");
                }
                warn!(symbol = %req.symbol, "falling back to unadjusted daily closes");
                let raw = self.fetch_function(DailyFunction::Raw, &req, &api_key).await?;
                (raw, DailyFunction::Raw)
            }
        };

        payload.into_series(&req, function)
    }
}

impl PriceSource for AlphaVantageAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Alphavantage
    }

    fn history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch_history(req))
    }
}

type DailyRow = BTreeMap<String, String>;

#[derive(Debug, Default, Deserialize)]
struct DailyPayload {
    #[serde(rename = "Meta Data", default)]
    meta: Option<BTreeMap<String, String>>,
    #[serde(rename = "Time Series (Daily)", default)]
    rows: Option<BTreeMap<String, DailyRow>>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Information", default)]
    information: Option<String>,
}

impl DailyPayload {
    /// Maps in-band API errors: `Error Message` is a bad request, `Note` and
    /// `Information` signal throttling.
    fn check(&self) -> Result<(), SourceError> {
        if let Some(message) = &self.error_message {
            return Err(SourceError::invalid_request(format!(
                "alphavantage error: {message}"
            )));
        }
        if let Some(message) = self.note.as_ref().or(self.information.as_ref()) {
            return Err(SourceError::rate_limited(format!(
                "alphavantage throttled: {message}"
            )));
        }
        Ok(())
    }

    fn has_rows(&self) -> bool {
        self.rows.as_ref().is_some_and(|rows| !rows.is_empty())
    }

    fn into_series(
        self,
        req: &HistoryRequest,
        function: DailyFunction,
    ) -> Result<PriceSeries, SourceError> {
        let rows = self
            .rows
            .filter(|rows| !rows.is_empty())
            .ok_or_else(|| SourceError::not_found(&req.symbol))?;

        let mut points = Vec::with_capacity(rows.len());
        let mut rejected = 0usize;
        for (day, row) in &rows {
            let date = Date::parse(day, format_description!("[year]-[month]-[day]")).map_err(|e| {
                SourceError::internal(format!("invalid alphavantage date '{day}': {e}"))
            })?;
            if !req.contains(date) {
                continue;
            }

            let close = field(row, "4. close");
            let (factor, volume_key) = match function {
                DailyFunction::Adjusted => {
                    let adjusted = field(row, "5. adjusted close");
                    let factor = if adjusted.is_finite() && adjusted > 0.0 && close > 0.0 {
                        adjusted / close
                    } else {
                        1.0
                    };
                    (factor, "6. volume")
                }
                DailyFunction::Raw => (1.0, "5. volume"),
            };
            let volume = row
                .get(volume_key)
                .and_then(|value| value.trim().parse::<u64>().ok())
                .filter(|volume| *volume > 0);

            match PricePoint::new(
                UtcDateTime::from_date(date),
                field(row, "1. open") * factor,
                field(row, "2. high") * factor,
                field(row, "3. low") * factor,
                close * factor,
                volume,
            ) {
                Ok(point) => points.push(point),
                Err(_) => rejected += 1,
            }
        }

        if rejected > 0 {
            warn!(symbol = %req.symbol, rejected, "alphavantage rows with inconsistent high/low skipped");
        }

        let name = self
            .meta
            .as_ref()
            .and_then(|meta| meta.get("2. Symbol"))
            .cloned()
            .unwrap_or_else(|| req.symbol.to_string());

        Ok(PriceSeries::new(req.symbol.clone(), points)
            .with_name(name)
            .with_source(ProviderId::Alphavantage.as_str())
            .with_adjusted(function == DailyFunction::Adjusted))
    }
}

fn field(row: &DailyRow, key: &str) -> f64 {
    row.get(key)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::Symbol;

    fn request() -> HistoryRequest {
        HistoryRequest::new(
            Symbol::parse("IBM").expect("symbol"),
            date!(2024 - 01 - 02),
            date!(2024 - 01 - 03),
        )
        .expect("request")
    }

    #[test]
    fn classifies_in_band_errors() {
        let error: DailyPayload =
            serde_json::from_str(r#"{"Error Message":"Invalid API call"}"#).expect("payload");
        assert_eq!(error.check().expect_err("error").code(), "source.invalid_request");

        let note: DailyPayload =
            serde_json::from_str(r#"{"Note":"Thank you for using Alpha Vantage"}"#).expect("payload");
        assert_eq!(note.check().expect_err("note").code(), "source.rate_limited");

        let info: DailyPayload =
            serde_json::from_str(r#"{"Information":"premium endpoint"}"#).expect("payload");
        assert!(info.check().expect_err("info").retryable());
    }

    #[test]
    fn filters_window_and_scales_adjusted_rows() {
        let body = r#"{
            "Meta Data": {"2. Symbol": "IBM"},
            "Time Series (Daily)": {
                "2024-01-04": {"1. open": "1", "2. high": "1", "3. low": "1", "4. close": "1", "5. adjusted close": "1", "6. volume": "1"},
                "2024-01-03": {"1. open": "20", "2. high": "22", "3. low": "18", "4. close": "20", "5. adjusted close": "10", "6. volume": "0"},
                "2024-01-02": {"1. open": "19", "2. high": "21", "3. low": "18", "4. close": "20", "5. adjusted close": "20", "6. volume": "500"}
            }
        }"#;
        let payload: DailyPayload = serde_json::from_str(body).expect("payload");
        let series = payload
            .into_series(&request(), DailyFunction::Adjusted)
            .expect("series");

        assert_eq!(series.len(), 2);
        assert!(series.is_adjusted());
        let points = series.sorted_points();
        assert_eq!(points[0].volume(), Some(500));
        assert_eq!(points[1].close(), 10.0);
        assert_eq!(points[1].high(), 11.0);
        assert_eq!(points[1].volume(), None);
    }

    #[test]
    fn raw_rows_use_unadjusted_volume_column() {
        let body = r#"{
            "Time Series (Daily)": {
                "2024-01-02": {"1. open": "19", "2. high": "21", "3. low": "18", "4. close": "20", "5. volume": "42"}
            }
        }"#;
        let payload: DailyPayload = serde_json::from_str(body).expect("payload");
        let series = payload
            .into_series(&request(), DailyFunction::Raw)
            .expect("series");
        assert!(!series.is_adjusted());
        assert_eq!(series.name(), "IBM");
        assert_eq!(series.points()[0].volume(), Some(42));
    }

    #[test]
    fn missing_rows_are_not_found() {
        let payload = DailyPayload::default();
        let err = payload
            .into_series(&request(), DailyFunction::Raw)
            .expect_err("must fail");
        assert_eq!(err.code(), "source.not_found");
    }
}
