//! The service instance: owns both caches and the store handle, and exposes
//! the operations renderers and command handlers call.

use crate::core::catalog::CatalogCache;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::AppConfig;
use crate::core::error::SubmitError;
use crate::core::market::{Identifier, MarketApi};
use crate::core::market_cache::{MarketDataCache, MarketSnapshot};
use crate::core::portfolio::{MarketView, PortfolioRow, PortfolioStore, PriceRow, RowFields};
use crate::core::resolver::IdentifierResolver;
use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Hint list offered to users picking a coin id.
pub const POPULAR_IDENTIFIERS: [&str; 10] = [
    "bitcoin",
    "ethereum",
    "tether",
    "binancecoin",
    "solana",
    "ripple",
    "dogecoin",
    "cardano",
    "tron",
    "polkadot",
];

pub struct CoinService {
    store: Arc<dyn PortfolioStore>,
    catalog: Arc<CatalogCache>,
    resolver: IdentifierResolver,
    market: MarketDataCache,
    market_ttl_secs: i64,
}

impl CoinService {
    pub fn new(
        api: Arc<dyn MarketApi>,
        store: Arc<dyn PortfolioStore>,
        clock: Arc<dyn Clock>,
        config: &AppConfig,
    ) -> Self {
        let catalog = Arc::new(CatalogCache::new(
            Arc::clone(&api),
            Arc::clone(&clock),
            config.cache.catalog_ttl_secs,
        ));
        let resolver = IdentifierResolver::new(Arc::clone(&api), Arc::clone(&catalog));
        let market = MarketDataCache::new(
            api,
            Arc::clone(&store),
            clock,
            &config.vs_currency,
            config.price_change_windows.clone(),
        );
        Self {
            store,
            catalog,
            resolver,
            market,
            market_ttl_secs: config.cache.market_ttl_secs,
        }
    }

    pub fn with_system_clock(
        api: Arc<dyn MarketApi>,
        store: Arc<dyn PortfolioStore>,
        config: &AppConfig,
    ) -> Self {
        Self::new(api, store, Arc::new(SystemClock), config)
    }

    pub fn store(&self) -> &dyn PortfolioStore {
        self.store.as_ref()
    }

    pub async fn valid_identifiers(&self) -> Arc<HashSet<Identifier>> {
        self.catalog.valid_identifiers().await
    }

    pub async fn resolve(&self, input: &str) -> Identifier {
        self.resolver.resolve(input).await
    }

    pub async fn market_snapshot(&self) -> MarketSnapshot {
        self.market.snapshot(self.market_ttl_secs).await
    }

    /// Resolves `input` and checks it against the catalog. An empty catalog
    /// means the upstream was unreachable, so the input is accepted as is.
    async fn resolve_validated(&self, input: &str) -> Result<Identifier, SubmitError> {
        let entered = input.trim();
        if entered.is_empty() {
            return Err(SubmitError::EmptyIdentifier);
        }

        let resolved = self.resolve(entered).await;
        let valid = self.valid_identifiers().await;
        if valid.is_empty() {
            warn!(coin_id = %resolved, "Coin catalog unavailable, accepting without validation");
        } else if !valid.contains(&resolved) {
            return Err(SubmitError::InvalidIdentifier {
                input: entered.to_string(),
            });
        }
        Ok(resolved)
    }

    /// Creates a row for the resolved identifier, or overwrites the fields
    /// of the row that already tracks it.
    pub async fn submit(&self, input: &str, fields: RowFields) -> Result<PortfolioRow, SubmitError> {
        let coin_id = self.resolve_validated(input).await?;

        let existing = self
            .store
            .find_by_identifier(&coin_id)
            .await
            .map_err(SubmitError::Storage)?;

        match existing {
            Some(mut row) => {
                row.fields = fields;
                self.store.update(&row).await.map_err(SubmitError::Storage)?;
                info!(id = row.id, coin_id = %row.coin_id, "Updated portfolio row");
                Ok(row)
            }
            None => {
                let row = self
                    .store
                    .insert(&coin_id, fields)
                    .await
                    .map_err(SubmitError::Storage)?;
                info!(id = row.id, coin_id = %row.coin_id, "Added portfolio row");
                Ok(row)
            }
        }
    }

    /// Replaces identifier and fields of row `id`.
    pub async fn edit(
        &self,
        id: u64,
        input: &str,
        fields: RowFields,
    ) -> Result<PortfolioRow, SubmitError> {
        let mut row = self
            .store
            .get(id)
            .await
            .map_err(SubmitError::Storage)?
            .ok_or(SubmitError::RowNotFound { id })?;

        let coin_id = self.resolve_validated(input).await?;
        let owner = self
            .store
            .find_by_identifier(&coin_id)
            .await
            .map_err(SubmitError::Storage)?;
        if owner.is_some_and(|other| other.id != id) {
            return Err(SubmitError::DuplicateIdentifier {
                identifier: coin_id,
            });
        }

        row.coin_id = coin_id;
        row.fields = fields;
        if !self.store.update(&row).await.map_err(SubmitError::Storage)? {
            return Err(SubmitError::RowNotFound { id });
        }
        info!(id, coin_id = %row.coin_id, "Edited portfolio row");
        Ok(row)
    }

    /// Best-effort removal. Store failures are logged, not raised.
    pub async fn delete(&self, id: u64) -> bool {
        match self.store.delete(id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(id, error = %e, "Failed to delete portfolio row");
                false
            }
        }
    }

    pub async fn market_view(&self) -> Result<MarketView> {
        let snapshot = self.market_snapshot().await;
        let rows = self.store.list().await?;
        Ok(MarketView::build(&rows, &snapshot))
    }

    pub async fn price_view(&self) -> Result<Vec<PriceRow>> {
        let snapshot = self.market_snapshot().await;
        let rows = self.store.list().await?;
        Ok(PriceRow::build(&rows, &snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::testing::ManualClock;
    use crate::core::market::testing::{FakeMarketApi, hit, record};
    use crate::store::memory::MemoryPortfolioStore;

    const T0: i64 = 1_700_000_000;

    fn service(api: Arc<FakeMarketApi>) -> (CoinService, Arc<MemoryPortfolioStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryPortfolioStore::new());
        let clock = Arc::new(ManualClock::new(T0));
        let svc = CoinService::new(api, store.clone(), clock.clone(), &AppConfig::default());
        (svc, store, clock)
    }

    #[tokio::test]
    async fn test_submit_resolves_and_creates_row() {
        let api = Arc::new(FakeMarketApi::with_listing(&["bitcoin", "spark-2"]));
        api.set_search(Some(vec![hit(Some("spark-2"), Some("Spark"), Some("fspark"))]));
        let (svc, store, _) = service(api);

        let row = svc.submit(" Spark ", RowFields::default()).await.unwrap();

        assert_eq!(row.coin_id, "spark-2");
        assert_eq!(store.list_identifiers().await.unwrap(), vec!["spark-2"]);
    }

    #[tokio::test]
    async fn test_submit_same_coin_updates_in_place() {
        let api = Arc::new(FakeMarketApi::with_listing(&["bitcoin"]));
        let (svc, store, _) = service(api);

        let first = svc.submit("bitcoin", RowFields::default()).await.unwrap();
        let fields = RowFields {
            amount: Some(0.1),
            ..Default::default()
        };
        let second = svc.submit("bitcoin", fields).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(store.get(first.id).await.unwrap().unwrap().fields.amount, Some(0.1));
    }

    #[tokio::test]
    async fn test_submit_rejects_unknown_coin_with_entered_text() {
        let api = Arc::new(FakeMarketApi::with_listing(&["bitcoin"]));
        api.set_search(Some(vec![]));
        let (svc, store, _) = service(api);

        let err = svc.submit("not a coin", RowFields::default()).await.unwrap_err();

        assert!(matches!(err, SubmitError::InvalidIdentifier { ref input } if input == "not a coin"));
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_submit_accepts_anything_when_catalog_unavailable() {
        let api = Arc::new(FakeMarketApi::default());
        let (svc, _, _) = service(api);

        let row = svc.submit("whatever", RowFields::default()).await.unwrap();
        assert_eq!(row.coin_id, "whatever");
    }

    #[tokio::test]
    async fn test_submit_empty_input() {
        let (svc, _, _) = service(Arc::new(FakeMarketApi::default()));
        let err = svc.submit("  ", RowFields::default()).await.unwrap_err();
        assert!(matches!(err, SubmitError::EmptyIdentifier));
    }

    #[tokio::test]
    async fn test_edit_row() {
        let api = Arc::new(FakeMarketApi::with_listing(&["bitcoin", "ethereum", "solana"]));
        let (svc, _, _) = service(api);
        let btc = svc.submit("bitcoin", RowFields::default()).await.unwrap();
        svc.submit("ethereum", RowFields::default()).await.unwrap();

        let edited = svc.edit(btc.id, "solana", RowFields::default()).await.unwrap();
        assert_eq!(edited.id, btc.id);
        assert_eq!(edited.coin_id, "solana");

        let err = svc.edit(btc.id, "ethereum", RowFields::default()).await.unwrap_err();
        assert!(matches!(err, SubmitError::DuplicateIdentifier { .. }));

        let err = svc.edit(42, "bitcoin", RowFields::default()).await.unwrap_err();
        assert!(matches!(err, SubmitError::RowNotFound { id: 42 }));
    }

    #[tokio::test]
    async fn test_delete() {
        let api = Arc::new(FakeMarketApi::with_listing(&["bitcoin"]));
        let (svc, _, _) = service(api);
        let row = svc.submit("bitcoin", RowFields::default()).await.unwrap();

        assert!(svc.delete(row.id).await);
        assert!(!svc.delete(row.id).await);
    }

    #[tokio::test]
    async fn test_new_row_shows_up_without_waiting_for_ttl() {
        let api = Arc::new(FakeMarketApi::with_listing(&["bitcoin", "ethereum", "solana"]));
        api.set_markets(Some(vec![
            record("bitcoin", 65000.0),
            record("ethereum", 3000.0),
            record("solana", 150.0),
        ]));
        let (svc, _, clock) = service(Arc::clone(&api));
        svc.submit("bitcoin", RowFields::default()).await.unwrap();
        svc.submit("ethereum", RowFields::default()).await.unwrap();

        let view = svc.market_view().await.unwrap();
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.last_refresh_epoch, Some(T0));
        assert_eq!(view.next_refresh_epoch, Some(T0 + 300));

        clock.advance(5);
        svc.submit("solana", RowFields::default()).await.unwrap();
        let view = svc.market_view().await.unwrap();

        assert_eq!(api.market_calls(), 2);
        assert_eq!(view.rows.len(), 3);
        assert_eq!(view.rows[2].coin_id, "solana");
    }

    #[tokio::test]
    async fn test_price_view_uses_cached_snapshot() {
        let api = Arc::new(FakeMarketApi::with_listing(&["solana"]));
        api.set_markets(Some(vec![record("solana", 150.0)]));
        let (svc, _, _) = service(Arc::clone(&api));
        let fields = RowFields {
            buy_price: Some(100.0),
            amount: Some(3.0),
            ..Default::default()
        };
        svc.submit("solana", fields).await.unwrap();

        svc.market_view().await.unwrap();
        let prices = svc.price_view().await.unwrap();

        assert_eq!(api.market_calls(), 1);
        assert_eq!(prices[0].profit, 150.0);
    }
}
