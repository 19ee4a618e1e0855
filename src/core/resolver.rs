//! Maps free-text user input (names, symbols, slugs) onto canonical identifiers.

use crate::core::catalog::CatalogCache;
use crate::core::market::{Identifier, MarketApi, SearchCoin};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

type Matcher = fn(&SearchCoin, &str) -> bool;

fn eq_ignore_case(field: Option<&String>, lowered_input: &str) -> bool {
    field.is_some_and(|value| value.to_lowercase() == lowered_input)
}

fn by_id(coin: &SearchCoin, input: &str) -> bool {
    eq_ignore_case(coin.id.as_ref(), input)
}

fn by_name(coin: &SearchCoin, input: &str) -> bool {
    eq_ignore_case(coin.name.as_ref(), input)
}

fn by_symbol(coin: &SearchCoin, input: &str) -> bool {
    eq_ignore_case(coin.symbol.as_ref(), input)
}

/// Tie-break tiers applied to search hits, strongest first. The first tier
/// with any hit wins; if none does, the top-ranked hit is used.
const MATCHERS: [(&str, Matcher); 3] = [("id", by_id), ("name", by_name), ("symbol", by_symbol)];

/// Picks the best search hit for `input`.
pub fn best_match<'a>(coins: &'a [SearchCoin], input: &str) -> Option<&'a SearchCoin> {
    let lowered = input.to_lowercase();
    MATCHERS
        .iter()
        .find_map(|&(tier, matches)| {
            let found = coins.iter().find(|coin| matches(coin, &lowered));
            if found.is_some() {
                debug!(tier, "Exact search match");
            }
            found
        })
        .or_else(|| coins.first())
}

pub struct IdentifierResolver {
    api: Arc<dyn MarketApi>,
    catalog: Arc<CatalogCache>,
}

impl IdentifierResolver {
    pub fn new(api: Arc<dyn MarketApi>, catalog: Arc<CatalogCache>) -> Self {
        Self { api, catalog }
    }

    /// Best-effort resolution. Never fails: anything that goes wrong yields
    /// the trimmed input, and later validation decides whether it is real.
    #[instrument(name = "ResolveIdentifier", skip(self))]
    pub async fn resolve(&self, input: &str) -> Identifier {
        let entered = input.trim();
        if entered.is_empty() {
            return String::new();
        }

        let valid = self.catalog.valid_identifiers().await;
        if !valid.is_empty() && valid.contains(entered) {
            debug!("Input is already a known coin id");
            return entered.to_string();
        }

        let result = match self.api.search(entered).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Coin search failed, keeping input as entered");
                return entered.to_string();
            }
        };

        let coins = result.coins.unwrap_or_default();
        match best_match(&coins, entered) {
            Some(coin) => coin.id.clone().unwrap_or_else(|| entered.to_string()),
            None => {
                debug!("Search returned no coins");
                entered.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::DEFAULT_CATALOG_TTL_SECS;
    use crate::core::clock::testing::ManualClock;
    use crate::core::market::testing::{FakeMarketApi, hit};

    fn resolver_with(api: Arc<FakeMarketApi>) -> IdentifierResolver {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let catalog = Arc::new(CatalogCache::new(
            api.clone(),
            clock,
            DEFAULT_CATALOG_TTL_SECS,
        ));
        IdentifierResolver::new(api, catalog)
    }

    #[tokio::test]
    async fn test_empty_input_is_returned_unchanged() {
        let api = Arc::new(FakeMarketApi::with_listing(&["bitcoin"]));
        let resolver = resolver_with(Arc::clone(&api));

        assert_eq!(resolver.resolve("").await, "");
        assert_eq!(resolver.resolve("   ").await, "");
        assert_eq!(api.list_calls(), 0);
        assert_eq!(api.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_known_id_skips_search() {
        let api = Arc::new(FakeMarketApi::with_listing(&["bitcoin", "ethereum"]));
        let resolver = resolver_with(Arc::clone(&api));

        assert_eq!(resolver.resolve("  bitcoin ").await, "bitcoin");
        assert_eq!(api.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_exact_name_beats_ranking() {
        let api = Arc::new(FakeMarketApi::with_listing(&["bitcoin"]));
        api.set_search(Some(vec![
            hit(Some("spark-x"), Some("SparkX"), None),
            hit(Some("spark-2"), Some("Spark"), Some("fspark")),
        ]));
        let resolver = resolver_with(Arc::clone(&api));

        assert_eq!(resolver.resolve("Spark").await, "spark-2");
        assert_eq!(api.search_calls(), 1);
    }

    #[tokio::test]
    async fn test_spark_example_in_rank_order() {
        let api = Arc::new(FakeMarketApi::default());
        api.set_search(Some(vec![
            hit(Some("spark-2"), Some("Spark"), Some("fspark")),
            hit(Some("spark-x"), Some("SparkX"), None),
        ]));
        let resolver = resolver_with(api);

        assert_eq!(resolver.resolve("Spark").await, "spark-2");
    }

    #[tokio::test]
    async fn test_id_tier_beats_name_tier() {
        let api = Arc::new(FakeMarketApi::default());
        api.set_search(Some(vec![
            hit(Some("wrapped-eth"), Some("ETH"), None),
            hit(Some("eth"), Some("Something Else"), None),
        ]));
        let resolver = resolver_with(api);

        assert_eq!(resolver.resolve("ETH").await, "eth");
    }

    #[tokio::test]
    async fn test_symbol_tier_then_top_result() {
        let api = Arc::new(FakeMarketApi::default());
        api.set_search(Some(vec![
            hit(Some("first"), Some("First"), Some("fst")),
            hit(Some("dogecoin"), Some("Dogecoin"), Some("DOGE")),
        ]));
        let resolver = resolver_with(Arc::clone(&api));
        assert_eq!(resolver.resolve("doge").await, "dogecoin");

        assert_eq!(resolver.resolve("dog").await, "first");
    }

    #[tokio::test]
    async fn test_chosen_hit_without_id_falls_back_to_input() {
        let api = Arc::new(FakeMarketApi::default());
        api.set_search(Some(vec![hit(None, Some("Mystery"), None)]));
        let resolver = resolver_with(api);

        assert_eq!(resolver.resolve("mystery").await, "mystery");
    }

    #[tokio::test]
    async fn test_search_failure_or_no_hits_returns_input() {
        let api = Arc::new(FakeMarketApi::default());
        let resolver = resolver_with(Arc::clone(&api));
        assert_eq!(resolver.resolve(" sparky ").await, "sparky");

        api.set_search(Some(vec![]));
        assert_eq!(resolver.resolve("sparky").await, "sparky");
        assert_eq!(api.search_calls(), 2);
    }

    #[test]
    fn test_best_match_on_empty_slice() {
        assert!(best_match(&[], "anything").is_none());
    }
}
