use async_trait::async_trait;
use geoproof_types::{Contribution, Contributor, Coordinate, WalletAddress};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Outcome of a conditional coordinate insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Batch insert counters for one submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertStats {
    pub inserted: u64,
    pub duplicates: u64,
}

/// Trait for dedup store backend implementations.
///
/// The store is shared across all contributors and all runs; novelty of
/// a coordinate is always judged globally. `insert_if_absent` must be
/// atomic per key: two concurrent writers of the same coordinate observe
/// exactly one `Inserted`.
#[async_trait]
pub trait DedupBackend: Send + Sync {
    /// Conditionally insert a coordinate, leaving an existing key untouched.
    async fn insert_if_absent(&self, coordinate: &Coordinate) -> Result<InsertOutcome>;

    /// Check whether a coordinate is already present.
    async fn contains(&self, coordinate: &Coordinate) -> Result<bool>;

    /// Number of coordinates in the store.
    async fn coordinate_count(&self) -> Result<u64>;

    /// Persist the contributor row for a run.
    async fn record_contributor(&self, contributor: &Contributor) -> Result<()>;

    /// Persist one contribution audit row.
    async fn record_contribution(&self, contribution: &Contribution) -> Result<()>;

    /// Contribution rows recorded for a wallet, oldest first.
    async fn contributions_for(&self, wallet: &WalletAddress) -> Result<Vec<Contribution>>;

    /// Flush any pending writes.
    async fn flush(&self) -> Result<()>;
}
