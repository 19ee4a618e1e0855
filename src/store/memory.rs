use crate::core::portfolio::{PortfolioRow, PortfolioStore, RowFields};
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::debug;

struct Rows {
    next_id: u64,
    by_id: BTreeMap<u64, PortfolioRow>,
}

/// In-memory portfolio store, lost on exit.
pub struct MemoryPortfolioStore {
    inner: Mutex<Rows>,
}

impl MemoryPortfolioStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Rows {
                next_id: 1,
                by_id: BTreeMap::new(),
            }),
        }
    }
}

impl Default for MemoryPortfolioStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PortfolioStore for MemoryPortfolioStore {
    async fn list(&self) -> Result<Vec<PortfolioRow>> {
        Ok(self.inner.lock().await.by_id.values().cloned().collect())
    }

    async fn get(&self, id: u64) -> Result<Option<PortfolioRow>> {
        Ok(self.inner.lock().await.by_id.get(&id).cloned())
    }

    async fn find_by_identifier(&self, coin_id: &str) -> Result<Option<PortfolioRow>> {
        let rows = self.inner.lock().await;
        Ok(rows.by_id.values().find(|row| row.coin_id == coin_id).cloned())
    }

    async fn insert(&self, coin_id: &str, fields: RowFields) -> Result<PortfolioRow> {
        let mut rows = self.inner.lock().await;
        if rows.by_id.values().any(|row| row.coin_id == coin_id) {
            bail!("A row for {coin_id} already exists");
        }
        let row = PortfolioRow {
            id: rows.next_id,
            coin_id: coin_id.to_string(),
            fields,
        };
        rows.next_id += 1;
        rows.by_id.insert(row.id, row.clone());
        debug!(id = row.id, coin_id, "Row INSERT");
        Ok(row)
    }

    async fn update(&self, row: &PortfolioRow) -> Result<bool> {
        let mut rows = self.inner.lock().await;
        if rows
            .by_id
            .values()
            .any(|other| other.id != row.id && other.coin_id == row.coin_id)
        {
            bail!("A row for {} already exists", row.coin_id);
        }
        match rows.by_id.get_mut(&row.id) {
            Some(existing) => {
                *existing = row.clone();
                debug!(id = row.id, "Row UPDATE");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let removed = self.inner.lock().await.by_id.remove(&id).is_some();
        debug!(id, removed, "Row DELETE");
        Ok(removed)
    }
}
