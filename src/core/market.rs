//! Upstream market API contract and the records it returns

use crate::core::error::UpstreamError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Canonical token naming an asset in the upstream namespace, e.g. `spark-2`.
pub type Identifier = String;

/// One entry of the full upstream coin list.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinListing {
    pub id: Option<Identifier>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One hit of a free-text search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchCoin {
    pub id: Option<Identifier>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub coins: Option<Vec<SearchCoin>>,
}

/// Market data for a single asset, quoted in the configured currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    pub id: Option<Identifier>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub total_supply: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub fully_diluted_valuation: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h_in_currency: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_7d_in_currency: Option<f64>,
}

impl MarketRecord {
    /// 24h change, preferring the currency-specific field when present.
    pub fn change_24h(&self) -> Option<f64> {
        self.price_change_percentage_24h_in_currency
            .or(self.price_change_percentage_24h)
    }
}

#[async_trait]
pub trait MarketApi: Send + Sync {
    /// Every identifier the upstream currently knows.
    async fn list_identifiers(&self) -> Result<Vec<CoinListing>, UpstreamError>;

    /// Batched market data for `ids`, optionally with extra percentage-change
    /// windows such as `24h` or `7d`.
    async fn markets(
        &self,
        vs_currency: &str,
        ids: &[Identifier],
        change_windows: &[String],
    ) -> Result<Vec<MarketRecord>, UpstreamError>;

    async fn search(&self, query: &str) -> Result<SearchResult, UpstreamError>;
}
