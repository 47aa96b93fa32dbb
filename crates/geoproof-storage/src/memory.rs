use crate::backend::{DedupBackend, InsertOutcome, Result};
use async_trait::async_trait;
use geoproof_types::{Contribution, Contributor, Coordinate, WalletAddress};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory dedup backend for testing and development.
pub struct MemoryBackend {
    coordinates: Arc<RwLock<HashSet<Coordinate>>>,
    contributors: Arc<RwLock<Vec<Contributor>>>,
    contributions: Arc<RwLock<Vec<Contribution>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            coordinates: Arc::new(RwLock::new(HashSet::new())),
            contributors: Arc::new(RwLock::new(Vec::new())),
            contributions: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Contributor rows recorded so far, in insertion order.
    pub async fn contributors(&self) -> Vec<Contributor> {
        self.contributors.read().await.clone()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DedupBackend for MemoryBackend {
    async fn insert_if_absent(&self, coordinate: &Coordinate) -> Result<InsertOutcome> {
        // The write guard spans check and insert, so concurrent writers
        // of one key observe exactly one `Inserted`.
        let mut coordinates = self.coordinates.write().await;
        if coordinates.insert(*coordinate) {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::Duplicate)
        }
    }

    async fn contains(&self, coordinate: &Coordinate) -> Result<bool> {
        let coordinates = self.coordinates.read().await;
        Ok(coordinates.contains(coordinate))
    }

    async fn coordinate_count(&self) -> Result<u64> {
        let coordinates = self.coordinates.read().await;
        Ok(coordinates.len() as u64)
    }

    async fn record_contributor(&self, contributor: &Contributor) -> Result<()> {
        let mut contributors = self.contributors.write().await;
        contributors.push(contributor.clone());
        Ok(())
    }

    async fn record_contribution(&self, contribution: &Contribution) -> Result<()> {
        let mut contributions = self.contributions.write().await;
        contributions.push(contribution.clone());
        Ok(())
    }

    async fn contributions_for(&self, wallet: &WalletAddress) -> Result<Vec<Contribution>> {
        let contributions = self.contributions.read().await;
        Ok(contributions
            .iter()
            .filter(|c| c.wallet_address == *wallet)
            .cloned()
            .collect())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use geoproof_types::STORAGE_SOURCE_GOOGLE_DRIVE;

    #[tokio::test]
    async fn test_insert_if_absent_classifies_duplicates() {
        let backend = MemoryBackend::new();
        let coordinate = Coordinate::new(37.421955, -122.084058);

        assert_eq!(
            backend.insert_if_absent(&coordinate).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            backend.insert_if_absent(&coordinate).await.unwrap(),
            InsertOutcome::Duplicate
        );
        assert!(backend.contains(&coordinate).await.unwrap());
        assert_eq!(backend.coordinate_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_of_one_key_yield_one_inserted() {
        let backend = Arc::new(MemoryBackend::new());
        let coordinate = Coordinate::new(1.5, 2.5);

        let mut handles = vec![];
        for _ in 0..16 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend.insert_if_absent(&coordinate).await.unwrap()
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() == InsertOutcome::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(backend.coordinate_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_contribution_rows_filter_by_wallet() {
        let backend = MemoryBackend::new();
        let wallet_a = WalletAddress::from_bytes([1; 20]);
        let wallet_b = WalletAddress::from_bytes([2; 20]);

        for (wallet, file_id) in [(wallet_a, 1), (wallet_a, 2), (wallet_b, 3)] {
            backend
                .record_contribution(&Contribution {
                    wallet_address: wallet,
                    file_id,
                    score: 0.0,
                    quality: 0.0,
                    uniqueness: 0.0,
                    authenticity: 0.0,
                    ownership: 0.0,
                    valid: true,
                    coordinates: 0,
                    unique_coordinates: 0,
                    errors: vec![],
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let rows = backend.contributions_for(&wallet_a).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].file_id, 1);

        backend
            .record_contributor(&Contributor {
                wallet_address: wallet_a,
                storage_user_id_hash: None,
                storage_source: STORAGE_SOURCE_GOOGLE_DRIVE.to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        assert_eq!(backend.contributors().await.len(), 1);
    }
}
