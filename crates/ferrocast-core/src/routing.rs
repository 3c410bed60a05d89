//! Provider selection per symbol and bounded-concurrency batch fetching.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use time::Date;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::adapters::{AlphaVantageAdapter, YahooAdapter};
use crate::config::FetchSettings;
use crate::data_source::{HistoryRequest, PriceSource, SourceError};
use crate::{PriceSeries, ProviderId, Symbol};

/// Series that arrived plus the symbols that failed, keyed by symbol.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub series: BTreeMap<Symbol, PriceSeries>,
    pub failures: BTreeMap<Symbol, SourceError>,
}

impl FetchOutcome {
    fn record(&mut self, symbol: Symbol, provider: ProviderId, result: Result<PriceSeries, SourceError>) {
        match result {
            Ok(series) => {
                info!(symbol = %symbol, provider = %provider, points = series.len(), "fetched price history");
                self.series.insert(symbol, series);
            }
            Err(error) => {
                warn!(symbol = %symbol, provider = %provider, code = error.code(), error = %error, "fetch failed");
                self.failures.insert(symbol, error);
            }
        }
    }
}

/// Adapter registry with a default provider and per-symbol overrides.
pub struct SourceRegistry {
    adapters: HashMap<ProviderId, Arc<dyn PriceSource>>,
    default_provider: ProviderId,
    overrides: HashMap<Symbol, ProviderId>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        let adapters: Vec<Arc<dyn PriceSource>> = vec![
            Arc::new(YahooAdapter::default()),
            Arc::new(AlphaVantageAdapter::default()),
        ];
        Self::new(adapters, ProviderId::Yahoo)
    }
}

impl SourceRegistry {
    pub fn new(adapters: Vec<Arc<dyn PriceSource>>, default_provider: ProviderId) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.id(), adapter))
            .collect();
        Self {
            adapters,
            default_provider,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, symbol: Symbol, provider: ProviderId) -> Self {
        self.overrides.insert(symbol, provider);
        self
    }

    pub fn default_provider(&self) -> ProviderId {
        self.default_provider
    }

    pub fn provider_for(&self, symbol: &Symbol) -> ProviderId {
        self.overrides
            .get(symbol)
            .copied()
            .unwrap_or(self.default_provider)
    }

    fn adapter(&self, provider: ProviderId) -> Result<Arc<dyn PriceSource>, SourceError> {
        self.adapters
            .get(&provider)
            .cloned()
            .ok_or_else(|| SourceError::adapter_not_registered(provider))
    }

    pub async fn fetch(
        &self,
        symbol: &Symbol,
        start: Date,
        end: Date,
    ) -> Result<PriceSeries, SourceError> {
        let adapter = self.adapter(self.provider_for(symbol))?;
        let request = HistoryRequest::new(symbol.clone(), start, end)?;
        adapter.history(request).await
    }

    /// Fetches every symbol, in parallel bounded by `settings.max_workers`
    /// or one after another when parallel fetching is off.
    pub async fn fetch_many(
        &self,
        symbols: &[Symbol],
        start: Date,
        end: Date,
        settings: &FetchSettings,
    ) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        info!(
            count = symbols.len(),
            parallel = settings.parallel,
            max_workers = settings.max_workers,
            "fetching price histories"
        );

        if !settings.parallel || symbols.len() <= 1 {
            for symbol in symbols {
                let provider = self.provider_for(symbol);
                let result = self.fetch(symbol, start, end).await;
                outcome.record(symbol.clone(), provider, result);
            }
            return outcome;
        }

        let permits = Arc::new(Semaphore::new(settings.max_workers.max(1)));
        let mut tasks = JoinSet::new();
        let mut pending = BTreeMap::new();
        for symbol in symbols {
            let provider = self.provider_for(symbol);
            let adapter = match self.adapter(provider) {
                Ok(adapter) => adapter,
                Err(error) => {
                    outcome.record(symbol.clone(), provider, Err(error));
                    continue;
                }
            };
            let request = match HistoryRequest::new(symbol.clone(), start, end) {
                Ok(request) => request,
                Err(error) => {
                    outcome.record(symbol.clone(), provider, Err(error));
                    continue;
                }
            };

            let permits = Arc::clone(&permits);
            let symbol = symbol.clone();
            pending.insert(symbol.clone(), provider);
            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => adapter.history(request).await,
                    Err(_) => Err(SourceError::internal("fetch worker pool closed")),
                };
                (symbol, provider, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((symbol, provider, result)) => {
                    pending.remove(&symbol);
                    outcome.record(symbol, provider, result);
                }
                Err(error) => warn!(error = %error, "fetch task aborted"),
            }
        }

        // Tasks that panicked or were cancelled never reported back.
        for (symbol, provider) in pending {
            outcome.record(
                symbol,
                provider,
                Err(SourceError::internal("fetch task aborted before completing")),
            );
        }
        outcome
    }
}
