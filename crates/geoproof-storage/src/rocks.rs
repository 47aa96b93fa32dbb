use crate::backend::{DedupBackend, InsertOutcome, Result, StorageError};
use async_trait::async_trait;
use geoproof_types::{Contribution, Contributor, Coordinate, WalletAddress};
use rocksdb::{ColumnFamily, IteratorMode, Options, DB};
use std::sync::Arc;
use tokio::sync::Mutex;

const CF_COORDINATES: &str = "coordinates";
const CF_CONTRIBUTORS: &str = "contributors";
const CF_CONTRIBUTIONS: &str = "contributions";

/// RocksDB-backed dedup store.
///
/// Coordinates are keyed by their 16-byte bit encoding; contributor and
/// contribution rows are JSON values under wallet-prefixed keys with
/// zero-padded timestamps so prefix scans return them in order.
pub struct RocksBackend {
    db: Arc<DB>,
    // Serializes the check-then-put of `insert_if_absent` so concurrent
    // writers of one key cannot both observe absence.
    write_lock: Mutex<()>,
}

impl RocksBackend {
    pub fn new(path: &str) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_names = vec![CF_COORDINATES, CF_CONTRIBUTORS, CF_CONTRIBUTIONS];
        let db = DB::open_cf(&opts, path, &cf_names)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::Backend(format!("column family not found: {}", name)))
    }

    fn contribution_key(row: &Contribution) -> Vec<u8> {
        format!(
            "{}:{:020}:{}",
            hex::encode(row.wallet_address.as_bytes()),
            row.created_at.timestamp_millis(),
            row.file_id
        )
        .into_bytes()
    }
}

#[async_trait]
impl DedupBackend for RocksBackend {
    async fn insert_if_absent(&self, coordinate: &Coordinate) -> Result<InsertOutcome> {
        let _guard = self.write_lock.lock().await;

        let cf = self.cf(CF_COORDINATES)?;
        let key = coordinate.store_key();
        let existing = self
            .db
            .get_cf(cf, key)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        if existing.is_some() {
            return Ok(InsertOutcome::Duplicate);
        }

        self.db
            .put_cf(cf, key, [])
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(InsertOutcome::Inserted)
    }

    async fn contains(&self, coordinate: &Coordinate) -> Result<bool> {
        let cf = self.cf(CF_COORDINATES)?;
        let existing = self
            .db
            .get_cf(cf, coordinate.store_key())
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(existing.is_some())
    }

    async fn coordinate_count(&self) -> Result<u64> {
        let cf = self.cf(CF_COORDINATES)?;
        let mut count = 0u64;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item.map_err(|e| StorageError::Backend(e.to_string()))?;
            count += 1;
        }
        Ok(count)
    }

    async fn record_contributor(&self, contributor: &Contributor) -> Result<()> {
        let cf = self.cf(CF_CONTRIBUTORS)?;
        let key = format!(
            "{}:{:020}",
            hex::encode(contributor.wallet_address.as_bytes()),
            contributor.created_at.timestamp_millis()
        );
        let value = serde_json::to_vec(contributor)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.db
            .put_cf(cf, key.as_bytes(), value)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn record_contribution(&self, contribution: &Contribution) -> Result<()> {
        let cf = self.cf(CF_CONTRIBUTIONS)?;
        let key = Self::contribution_key(contribution);
        let value = serde_json::to_vec(contribution)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.db
            .put_cf(cf, key, value)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn contributions_for(&self, wallet: &WalletAddress) -> Result<Vec<Contribution>> {
        let cf = self.cf(CF_CONTRIBUTIONS)?;
        let prefix = format!("{}:", hex::encode(wallet.as_bytes()));

        let mut rows = Vec::new();
        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(prefix.as_bytes(), rocksdb::Direction::Forward),
        );
        for item in iter {
            let (key, value) = item.map_err(|e| StorageError::Backend(e.to_string()))?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let row: Contribution = serde_json::from_slice(&value)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            rows.push(row);
        }
        Ok(rows)
    }

    async fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}
