//! Long-lived cache of every identifier the upstream considers valid.

use crate::core::clock::Clock;
use crate::core::market::{Identifier, MarketApi};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_CATALOG_TTL_SECS: i64 = 3600;

struct CatalogState {
    ids: Arc<HashSet<Identifier>>,
    last_fetch_epoch: i64,
}

/// Holds the last successfully fetched identifier catalog.
///
/// The set is only ever replaced by a newer successful fetch; an expired
/// catalog keeps being served until that happens. An empty set means
/// validation cannot be performed, not that nothing is valid.
pub struct CatalogCache {
    api: Arc<dyn MarketApi>,
    clock: Arc<dyn Clock>,
    ttl_secs: i64,
    state: Mutex<CatalogState>,
}

impl CatalogCache {
    pub fn new(api: Arc<dyn MarketApi>, clock: Arc<dyn Clock>, ttl_secs: i64) -> Self {
        Self {
            api,
            clock,
            ttl_secs,
            state: Mutex::new(CatalogState {
                ids: Arc::new(HashSet::new()),
                last_fetch_epoch: 0,
            }),
        }
    }

    pub async fn valid_identifiers(&self) -> Arc<HashSet<Identifier>> {
        let now = self.clock.now();
        {
            let state = self.state.lock().await;
            let expired = now - state.last_fetch_epoch > self.ttl_secs;
            if !state.ids.is_empty() && !expired {
                debug!(count = state.ids.len(), "Catalog cache HIT");
                return Arc::clone(&state.ids);
            }
        }

        debug!("Catalog cache MISS, fetching coin list");
        match self.api.list_identifiers().await {
            Ok(listing) => {
                let ids: HashSet<Identifier> =
                    listing.into_iter().filter_map(|coin| coin.id).collect();
                info!(count = ids.len(), "Refreshed coin catalog");
                let mut state = self.state.lock().await;
                state.ids = Arc::new(ids);
                state.last_fetch_epoch = now;
                Arc::clone(&state.ids)
            }
            Err(e) => {
                warn!(error = %e, "Coin list fetch failed, keeping cached catalog");
                Arc::clone(&self.state.lock().await.ids)
            }
        }
    }

    /// Epoch of the last successful fetch, `None` if there never was one.
    pub async fn last_fetch_epoch(&self) -> Option<i64> {
        let state = self.state.lock().await;
        (state.last_fetch_epoch > 0).then_some(state.last_fetch_epoch)
    }
}
