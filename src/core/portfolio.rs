//! Portfolio rows, the store contract the core reads from, and the merged
//! views handed to renderers.

use crate::core::market::{Identifier, MarketRecord};
use crate::core::market_cache::MarketSnapshot;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Manually entered values of a portfolio row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowFields {
    pub buy_price: Option<f64>,
    pub amount: Option<f64>,
    pub found_raises: Option<f64>,
    /// Either a fraction (0.25) or a whole percentage (25).
    pub investor_percentage: Option<f64>,
    pub financing_valuation: Option<f64>,
    /// Manual override, used when the price cannot be derived.
    pub financing_based_price: Option<f64>,
    pub annualized_income: Option<f64>,
    pub income_valuation: Option<f64>,
    pub income_based_price: Option<f64>,
    pub tokenomics: String,
    pub vesting: String,
    pub cexs: String,
    pub tags: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRow {
    pub id: u64,
    pub coin_id: Identifier,
    #[serde(flatten)]
    pub fields: RowFields,
}

/// Storage for portfolio rows. At most one row per identifier.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Rows in insertion order.
    async fn list(&self) -> Result<Vec<PortfolioRow>>;

    async fn get(&self, id: u64) -> Result<Option<PortfolioRow>>;

    async fn find_by_identifier(&self, coin_id: &str) -> Result<Option<PortfolioRow>>;

    /// Creates a row and returns it with its assigned id.
    async fn insert(&self, coin_id: &str, fields: RowFields) -> Result<PortfolioRow>;

    /// Replaces an existing row; returns false if no row has that id.
    async fn update(&self, row: &PortfolioRow) -> Result<bool>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: u64) -> Result<bool>;

    async fn list_identifiers(&self) -> Result<Vec<Identifier>> {
        Ok(self.list().await?.into_iter().map(|row| row.coin_id).collect())
    }

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.list().await?.is_empty())
    }
}

pub const DEFAULT_SEED: [&str; 3] = ["bitcoin", "ethereum", "solana"];

/// Fills an empty store with a few well-known coins. Returns how many rows
/// were added.
pub async fn seed_defaults(store: &dyn PortfolioStore) -> Result<usize> {
    if !store.is_empty().await? {
        return Ok(0);
    }
    for coin_id in DEFAULT_SEED {
        store.insert(coin_id, RowFields::default()).await?;
    }
    Ok(DEFAULT_SEED.len())
}

/// Investor share as a 0-1 fraction. Values up to 1 are taken as already
/// fractional, anything larger as a whole percentage. A genuine 0.5% entered
/// as `0.5` is therefore read as 50%.
pub fn investor_fraction(percentage: f64) -> f64 {
    if percentage <= 1.0 {
        percentage
    } else {
        percentage / 100.0
    }
}

/// `found_raises / (total_supply * investor_fraction)`, when every input is
/// present and nonzero.
pub fn financing_based_price(
    total_supply: Option<f64>,
    found_raises: Option<f64>,
    investor_percentage: Option<f64>,
) -> Option<f64> {
    let total_supply = total_supply.filter(|s| *s > 0.0)?;
    let found_raises = found_raises.filter(|r| *r != 0.0)?;
    let percentage = investor_percentage.filter(|p| *p != 0.0)?;

    let denominator = total_supply * investor_fraction(percentage);
    if denominator == 0.0 {
        return None;
    }
    let price = found_raises / denominator;
    price.is_finite().then_some(price)
}

/// One line of the market table: upstream data joined with the manual row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRow {
    pub row_id: u64,
    pub coin_id: Identifier,
    pub coin_name: Option<String>,
    pub price: Option<f64>,
    pub current_supply: Option<f64>,
    pub current_market_cap: Option<f64>,
    pub total_supply: Option<f64>,
    pub total_market_cap: Option<f64>,
    pub last_updated: Option<String>,
    pub change_24h: Option<f64>,
    pub change_7d: Option<f64>,
    pub found_raises: Option<f64>,
    pub investor_percentage: Option<f64>,
    pub financing_valuation: Option<f64>,
    pub financing_based_price: Option<f64>,
    pub annualized_income: Option<f64>,
    pub income_valuation: Option<f64>,
    pub income_based_price: Option<f64>,
    pub tokenomics: String,
    pub vesting: String,
    pub cexs: String,
    pub tags: String,
}

impl MarketRow {
    pub fn new(row: &PortfolioRow, market: &MarketRecord) -> Self {
        let fields = &row.fields;
        let financing_price = financing_based_price(
            market.total_supply,
            fields.found_raises,
            fields.investor_percentage,
        )
        .or(fields.financing_based_price);

        Self {
            row_id: row.id,
            coin_id: row.coin_id.clone(),
            coin_name: market.name.clone(),
            price: market.current_price,
            current_supply: market.circulating_supply,
            current_market_cap: market.market_cap,
            total_supply: market.total_supply,
            total_market_cap: market.fully_diluted_valuation,
            last_updated: market.last_updated.clone(),
            change_24h: market.change_24h(),
            change_7d: market.price_change_percentage_7d_in_currency,
            found_raises: fields.found_raises,
            investor_percentage: fields.investor_percentage,
            financing_valuation: fields.financing_valuation,
            financing_based_price: financing_price,
            annualized_income: fields.annualized_income,
            income_valuation: fields.income_valuation,
            income_based_price: fields.income_based_price,
            tokenomics: fields.tokenomics.clone(),
            vesting: fields.vesting.clone(),
            cexs: fields.cexs.clone(),
            tags: fields.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketView {
    pub rows: Vec<MarketRow>,
    pub last_refresh_epoch: Option<i64>,
    pub next_refresh_epoch: Option<i64>,
}

impl MarketView {
    /// Joins rows with the snapshot. Rows without market data are left out.
    pub fn build(rows: &[PortfolioRow], snapshot: &MarketSnapshot) -> Self {
        let rows = rows
            .iter()
            .filter_map(|row| {
                snapshot
                    .data
                    .get(&row.coin_id)
                    .map(|market| MarketRow::new(row, market))
            })
            .collect();
        Self {
            rows,
            last_refresh_epoch: snapshot.last_refresh_epoch(),
            next_refresh_epoch: snapshot.next_refresh_epoch(),
        }
    }
}

/// Holding-level profit line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRow {
    pub coin_id: Identifier,
    pub name: Option<String>,
    pub current_price: Option<f64>,
    pub buy_price: Option<f64>,
    pub amount: Option<f64>,
    pub profit: f64,
}

impl PriceRow {
    pub fn new(row: &PortfolioRow, market: &MarketRecord) -> Self {
        let buy_price = row.fields.buy_price.unwrap_or(0.0);
        let amount = row.fields.amount.unwrap_or(0.0);
        let profit = match market.current_price {
            Some(current) if buy_price != 0.0 && amount != 0.0 => (current - buy_price) * amount,
            _ => 0.0,
        };
        Self {
            coin_id: row.coin_id.clone(),
            name: market.name.clone(),
            current_price: market.current_price,
            buy_price: Some(buy_price),
            amount: Some(amount),
            profit,
        }
    }

    pub fn build(rows: &[PortfolioRow], snapshot: &MarketSnapshot) -> Vec<Self> {
        rows.iter()
            .filter_map(|row| {
                snapshot
                    .data
                    .get(&row.coin_id)
                    .map(|market| PriceRow::new(row, market))
            })
            .collect()
    }
}
