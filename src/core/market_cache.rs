//! Short-lived cache of market data for the currently configured coins.
//!
//! A snapshot is tied to the signature of the coin set it was fetched for.
//! Changing the configured set forces a refetch on the next read, regardless
//! of how much TTL is left. Failed fetches leave the previous snapshot,
//! timestamp and signature untouched so readers keep seeing the last good
//! data.

use crate::core::clock::Clock;
use crate::core::market::{Identifier, MarketApi, MarketRecord};
use crate::core::portfolio::PortfolioStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_MARKET_TTL_SECS: i64 = 300;

pub type MarketData = HashMap<Identifier, MarketRecord>;

/// Sorted, comma-joined identifier list.
pub fn signature(ids: &[Identifier]) -> String {
    let mut sorted: Vec<&str> = ids.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(",")
}

/// What a reader gets back: the data plus enough metadata to tell when it
/// was fetched and when it will next be refreshed.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub data: Arc<MarketData>,
    /// Epoch seconds of the last successful fetch, 0 if none yet.
    pub last_fetch_epoch: i64,
    pub ttl_secs: i64,
}

impl MarketSnapshot {
    pub fn last_refresh_epoch(&self) -> Option<i64> {
        (self.last_fetch_epoch > 0).then_some(self.last_fetch_epoch)
    }

    pub fn next_refresh_epoch(&self) -> Option<i64> {
        self.last_refresh_epoch().map(|last| last + self.ttl_secs)
    }
}

struct MarketState {
    data: Arc<MarketData>,
    last_fetch_epoch: i64,
    signature: String,
}

pub struct MarketDataCache {
    api: Arc<dyn MarketApi>,
    store: Arc<dyn PortfolioStore>,
    clock: Arc<dyn Clock>,
    vs_currency: String,
    change_windows: Vec<String>,
    state: Mutex<MarketState>,
}

impl MarketDataCache {
    pub fn new(
        api: Arc<dyn MarketApi>,
        store: Arc<dyn PortfolioStore>,
        clock: Arc<dyn Clock>,
        vs_currency: &str,
        change_windows: Vec<String>,
    ) -> Self {
        Self {
            api,
            store,
            clock,
            vs_currency: vs_currency.to_string(),
            change_windows,
            state: Mutex::new(MarketState {
                data: Arc::new(HashMap::new()),
                last_fetch_epoch: 0,
                signature: String::new(),
            }),
        }
    }

    pub async fn snapshot(&self, ttl_secs: i64) -> MarketSnapshot {
        let ids = match self.store.list_identifiers().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Could not read configured coins, serving cached market data");
                return self.current(ttl_secs).await;
            }
        };

        if ids.is_empty() {
            debug!("No coins configured, skipping market fetch");
            let state = self.state.lock().await;
            return MarketSnapshot {
                data: Arc::new(HashMap::new()),
                last_fetch_epoch: state.last_fetch_epoch,
                ttl_secs,
            };
        }

        let ids_key = signature(&ids);
        let now = self.clock.now();
        let should_refresh = {
            let state = self.state.lock().await;
            let changed = state.signature != ids_key;
            let expired = now - state.last_fetch_epoch > ttl_secs;
            debug!(changed, expired, "Market cache freshness check");
            changed || expired
        };

        if should_refresh {
            self.refresh(&ids, ids_key, now).await;
        }
        self.current(ttl_secs).await
    }

    async fn refresh(&self, ids: &[Identifier], ids_key: String, now: i64) {
        match self
            .api
            .markets(&self.vs_currency, ids, &self.change_windows)
            .await
        {
            Ok(records) => {
                let data: MarketData = records
                    .into_iter()
                    .filter_map(|record| record.id.clone().map(|id| (id, record)))
                    .collect();
                info!(
                    requested = ids.len(),
                    received = data.len(),
                    "Refreshed market data"
                );
                let mut state = self.state.lock().await;
                state.data = Arc::new(data);
                state.last_fetch_epoch = now;
                state.signature = ids_key;
            }
            Err(e) => {
                warn!(error = %e, "Market fetch failed, serving previous snapshot");
            }
        }
    }

    async fn current(&self, ttl_secs: i64) -> MarketSnapshot {
        let state = self.state.lock().await;
        MarketSnapshot {
            data: Arc::clone(&state.data),
            last_fetch_epoch: state.last_fetch_epoch,
            ttl_secs,
        }
    }
}
