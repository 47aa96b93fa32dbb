use crate::backend::{DedupBackend, InsertOutcome, InsertStats, Result};
use geoproof_types::{Contribution, Contributor, Coordinate, WalletAddress};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Configuration for the dedup store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend_type: BackendType,
}

impl Default for StoreConfig {
    fn default() -> Self {
        #[cfg(feature = "rocksdb")]
        let backend_type = BackendType::RocksDb {
            path: std::env::var("GEOPROOF_DATA_DIR").unwrap_or_else(|_| "./data/dedup".to_string()),
        };

        #[cfg(not(feature = "rocksdb"))]
        let backend_type = BackendType::Memory;

        Self { backend_type }
    }
}

#[derive(Debug, Clone)]
pub enum BackendType {
    Memory,
    #[cfg(feature = "rocksdb")]
    RocksDb {
        path: String,
    },
}

/// High-level dedup store wrapping a backend implementation.
///
/// Handles are cheap to clone and are passed into the orchestrator
/// explicitly; there is no process-wide instance.
#[derive(Clone)]
pub struct DedupStore {
    backend: Arc<dyn DedupBackend>,
}

impl DedupStore {
    /// Create a store with the configured backend.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let backend: Arc<dyn DedupBackend> = match &config.backend_type {
            BackendType::Memory => Arc::new(crate::memory::MemoryBackend::new()),
            #[cfg(feature = "rocksdb")]
            BackendType::RocksDb { path } => Arc::new(crate::rocks::RocksBackend::new(path)?),
        };
        Ok(Self { backend })
    }

    /// Create a store over an existing backend handle.
    pub fn with_backend(backend: Arc<dyn DedupBackend>) -> Self {
        Self { backend }
    }

    /// Insert a batch of coordinates, classifying each as novel or
    /// already known. Each row's outcome is independent.
    pub async fn insert_many(&self, coordinates: &HashSet<Coordinate>) -> Result<InsertStats> {
        let mut stats = InsertStats::default();
        for coordinate in coordinates {
            match self.backend.insert_if_absent(coordinate).await? {
                InsertOutcome::Inserted => stats.inserted += 1,
                InsertOutcome::Duplicate => stats.duplicates += 1,
            }
        }

        info!(
            total = coordinates.len(),
            inserted = stats.inserted,
            duplicates = stats.duplicates,
            "💾 Coordinate batch deduplicated"
        );
        Ok(stats)
    }

    pub async fn contains(&self, coordinate: &Coordinate) -> Result<bool> {
        self.backend.contains(coordinate).await
    }

    pub async fn coordinate_count(&self) -> Result<u64> {
        self.backend.coordinate_count().await
    }

    pub async fn record_contributor(&self, contributor: &Contributor) -> Result<()> {
        info!(
            wallet = %contributor.wallet_address,
            storage_source = %contributor.storage_source,
            has_user_hash = contributor.storage_user_id_hash.is_some(),
            "Contributor recorded"
        );
        self.backend.record_contributor(contributor).await
    }

    pub async fn record_contribution(&self, contribution: &Contribution) -> Result<()> {
        self.backend.record_contribution(contribution).await
    }

    pub async fn contributions_for(&self, wallet: &WalletAddress) -> Result<Vec<Contribution>> {
        self.backend.contributions_for(wallet).await
    }

    pub async fn flush(&self) -> Result<()> {
        self.backend.flush().await
    }
}
