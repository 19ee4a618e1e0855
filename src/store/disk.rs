use crate::core::portfolio::{PortfolioRow, PortfolioStore, RowFields};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

const ROWS_PARTITION: &str = "coins";
const META_PARTITION: &str = "meta";
const NEXT_ID_KEY: &str = "next_id";

/// Portfolio rows persisted in a fjall keyspace. Rows are keyed by their
/// big-endian id so iteration yields insertion order.
pub struct DiskPortfolioStore {
    keyspace: Keyspace,
    rows: PartitionHandle,
    meta: PartitionHandle,
    // Serializes read-check-write sequences (id allocation, uniqueness).
    write_lock: Mutex<()>,
}

fn row_key(id: u64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

impl DiskPortfolioStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;
        let keyspace = Config::new(path)
            .open()
            .with_context(|| format!("Failed to open portfolio store at {}", path.display()))?;
        let rows = keyspace.open_partition(ROWS_PARTITION, PartitionCreateOptions::default())?;
        let meta = keyspace.open_partition(META_PARTITION, PartitionCreateOptions::default())?;
        debug!(path = %path.display(), "Opened portfolio store");
        Ok(Self {
            keyspace,
            rows,
            meta,
            write_lock: Mutex::new(()),
        })
    }

    fn scan(&self) -> Result<Vec<PortfolioRow>> {
        self.rows
            .iter()
            .map(|entry| {
                let (_, value) = entry?;
                serde_json::from_slice::<PortfolioRow>(&value)
                    .context("Corrupt portfolio row in store")
            })
            .collect()
    }

    fn next_id(&self) -> Result<u64> {
        let current = match self.meta.get(NEXT_ID_KEY)? {
            Some(bytes) => {
                let raw = <[u8; 8]>::try_from(&bytes[..])
                    .context("Corrupt id counter in store")?;
                u64::from_be_bytes(raw)
            }
            None => 1,
        };
        self.meta.insert(
            NEXT_ID_KEY.as_bytes().to_vec(),
            (current + 1).to_be_bytes().to_vec(),
        )?;
        Ok(current)
    }

    fn write(&self, row: &PortfolioRow) -> Result<()> {
        self.rows
            .insert(row_key(row.id), serde_json::to_vec(row)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}

#[async_trait]
impl PortfolioStore for DiskPortfolioStore {
    async fn list(&self) -> Result<Vec<PortfolioRow>> {
        self.scan()
    }

    async fn get(&self, id: u64) -> Result<Option<PortfolioRow>> {
        match self.rows.get(row_key(id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    async fn find_by_identifier(&self, coin_id: &str) -> Result<Option<PortfolioRow>> {
        Ok(self.scan()?.into_iter().find(|row| row.coin_id == coin_id))
    }

    async fn insert(&self, coin_id: &str, fields: RowFields) -> Result<PortfolioRow> {
        let _guard = self.write_lock.lock().await;
        if self.scan()?.iter().any(|row| row.coin_id == coin_id) {
            bail!("A row for {coin_id} already exists");
        }
        let row = PortfolioRow {
            id: self.next_id()?,
            coin_id: coin_id.to_string(),
            fields,
        };
        self.write(&row)
            .with_context(|| format!("Failed to insert row for {coin_id}"))?;
        debug!(id = row.id, coin_id, "Row INSERT");
        Ok(row)
    }

    async fn update(&self, row: &PortfolioRow) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let rows = self.scan()?;
        if !rows.iter().any(|existing| existing.id == row.id) {
            return Ok(false);
        }
        if rows
            .iter()
            .any(|other| other.id != row.id && other.coin_id == row.coin_id)
        {
            bail!("A row for {} already exists", row.coin_id);
        }
        self.write(row)
            .with_context(|| format!("Failed to update row {}", row.id))?;
        debug!(id = row.id, "Row UPDATE");
        Ok(true)
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let key = row_key(id);
        if self.rows.get(&key)?.is_none() {
            return Ok(false);
        }
        self.rows.remove(key)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(id, "Row DELETE");
        Ok(true)
    }
}
