use crate::config::NodeConfig;
use anyhow::{Context, Result};
use chrono::Utc;
use geoproof_ledger::{ContributionLedger, IdentityProvider};
use geoproof_schema::{detect_and_validate, extract_coordinates};
use geoproof_scoring as scoring;
use geoproof_storage::{DedupStore, InsertStats};
use geoproof_types::{
    Contribution, Contributor, ErrorCode, ProofResponse, SchemaVariant, WalletAddress,
    STORAGE_SOURCE_GOOGLE_DRIVE,
};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Drives one proof run over a directory of submission files.
///
/// All collaborators are injected; the engine owns no global state. One
/// run is a single sequential pipeline, suspending only on ledger and
/// identity calls and on store writes.
pub struct ProofEngine {
    config: NodeConfig,
    wallet: WalletAddress,
    store: DedupStore,
    ledger: Arc<dyn ContributionLedger>,
    identity: Arc<dyn IdentityProvider>,
}

struct FileOutcome {
    variant: SchemaVariant,
    raw_count: u64,
    stats: InsertStats,
}

impl ProofEngine {
    pub fn new(
        config: NodeConfig,
        store: DedupStore,
        ledger: Arc<dyn ContributionLedger>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        let wallet = config.wallet()?;
        Ok(Self {
            config,
            wallet,
            store,
            ledger,
            identity,
        })
    }

    /// Generate the proof for every submission file in the input
    /// directory.
    ///
    /// Collaborator failures degrade to error codes or logged
    /// conditions; the run itself only fails on operational faults such
    /// as an unreadable input directory or a broken store.
    pub async fn generate(&self) -> Result<ProofResponse> {
        info!(
            input_dir = %self.config.input.dir.display(),
            wallet = %self.wallet,
            dlp_id = self.config.node.dlp_id,
            "🚀 Starting proof generation"
        );

        let mut response = ProofResponse::new(self.config.node.dlp_id);
        let mut errors: Vec<ErrorCode> = Vec::new();

        let storage_user_hash = self.resolve_storage_user(&mut errors).await;

        let prior_files = self.prior_file_count().await;
        if prior_files > 0 {
            warn!(
                prior_files,
                wallet = %self.wallet,
                "Ledger already records contributions for this wallet"
            );
            errors.push(ErrorCode::DuplicateContribution);
        }

        let mut raw_total: u64 = 0;
        let mut totals = InsertStats::default();
        let mut last_variant: Option<SchemaVariant> = None;
        let mut contributor_recorded = false;

        for path in self.input_files()? {
            if let Some(outcome) = self
                .process_file(
                    &path,
                    &mut errors,
                    storage_user_hash.as_deref(),
                    &mut contributor_recorded,
                )
                .await?
            {
                raw_total += outcome.raw_count;
                totals.inserted += outcome.stats.inserted;
                totals.duplicates += outcome.stats.duplicates;
                last_variant = Some(outcome.variant);
            }
        }

        response.ownership = 0.0;
        response.authenticity = 0.0;
        response.quality = scoring::quality_score(raw_total);
        response.uniqueness = scoring::uniqueness_score(totals.inserted, totals.duplicates);
        response.score = scoring::composite_score(response.quality, response.uniqueness);
        response.valid = errors.is_empty();

        if let Some(variant) = last_variant {
            response
                .attributes
                .insert("schema_type".to_string(), json!(variant.as_tag()));
            response
                .metadata
                .insert("schema_type".to_string(), json!(variant.as_tag()));
        }
        response
            .attributes
            .insert("coordinates".to_string(), json!(raw_total));
        response
            .attributes
            .insert("unique_coordinates".to_string(), json!(totals.inserted));
        response.attributes.insert(
            "score_threshold".to_string(),
            json!(self.config.scoring.score_threshold),
        );
        if !errors.is_empty() {
            response
                .attributes
                .insert("errors".to_string(), json!(errors));
        }

        info!(
            score = response.score,
            quality = response.quality,
            uniqueness = response.uniqueness,
            valid = response.valid,
            coordinates = raw_total,
            inserted = totals.inserted,
            duplicates = totals.duplicates,
            "🏁 Proof generation finished"
        );

        Ok(response)
    }

    /// Submission files in a stable order; only `.json` entries count.
    fn input_files(&self) -> Result<Vec<PathBuf>> {
        let dir = &self.config.input.dir;
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("reading input directory {}", dir.display()))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    async fn resolve_storage_user(&self, errors: &mut Vec<ErrorCode>) -> Option<String> {
        let token = match self.config.identity.token.as_deref() {
            Some(t) => t,
            None => {
                errors.push(ErrorCode::MissingStorageToken);
                return None;
            }
        };

        match self.identity.resolve(token).await {
            Ok(user) => {
                let hash = hex::encode(Sha256::digest(user.id.as_bytes()));
                if !user.verified_email {
                    errors.push(ErrorCode::UnverifiedStorageEmail);
                }
                info!(
                    user_hash = %&hash[..16],
                    verified_email = user.verified_email,
                    "Storage identity resolved"
                );
                Some(hash)
            }
            Err(e) => {
                warn!(error = %e, "Failed to resolve storage identity");
                errors.push(ErrorCode::UnverifiedStorageUser);
                None
            }
        }
    }

    /// Ledger failures deliberately degrade to zero prior contributions:
    /// the run stays open rather than failing on registry outages.
    async fn prior_file_count(&self) -> u64 {
        match self.ledger.file_count(&self.wallet).await {
            Ok(count) => count,
            Err(e) => {
                warn!(
                    error = %e,
                    wallet = %self.wallet,
                    "Ledger lookup failed, treating as zero prior contributions"
                );
                0
            }
        }
    }

    /// Process one submission file. Returns `None` when the file never
    /// decoded to a payload at all; every decoded file yields an outcome
    /// and an audit row, valid or not.
    async fn process_file(
        &self,
        path: &Path,
        errors: &mut Vec<ErrorCode>,
        storage_user_hash: Option<&str>,
        contributor_recorded: &mut bool,
    ) -> Result<Option<FileOutcome>> {
        info!(file = %path.display(), "🔍 Checking file");

        let payload = match self.decode_file(path) {
            Some(payload) => payload,
            None => {
                errors.push(ErrorCode::InvalidSchema);
                return Ok(None);
            }
        };

        let (variant, schema_ok) = detect_and_validate(&payload);
        if !schema_ok {
            warn!(
                file = %path.display(),
                schema = %variant,
                "Submission failed schema validation"
            );
            errors.push(ErrorCode::InvalidSchema);
            let outcome = FileOutcome {
                variant,
                raw_count: 0,
                stats: InsertStats::default(),
            };
            self.record_contribution_row(&outcome, errors).await?;
            return Ok(Some(outcome));
        }

        let coordinates = extract_coordinates(&payload, variant);
        let raw_count = coordinates.len() as u64;
        if raw_count < scoring::MIN_COORDINATES {
            errors.push(ErrorCode::NotEnoughData);
        }

        if !*contributor_recorded {
            let contributor = Contributor {
                wallet_address: self.wallet,
                storage_user_id_hash: storage_user_hash.map(str::to_string),
                storage_source: STORAGE_SOURCE_GOOGLE_DRIVE.to_string(),
                created_at: Utc::now(),
            };
            self.store.record_contributor(&contributor).await?;
            *contributor_recorded = true;
        }

        let stats = self.store.insert_many(&coordinates).await?;
        let outcome = FileOutcome {
            variant,
            raw_count,
            stats,
        };
        self.record_contribution_row(&outcome, errors).await?;

        info!(
            file = %path.display(),
            schema = %variant,
            coordinates = raw_count,
            inserted = outcome.stats.inserted,
            duplicates = outcome.stats.duplicates,
            "✅ File processed"
        );
        Ok(Some(outcome))
    }

    fn decode_file(&self, path: &Path) -> Option<Value> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Submission file is unreadable");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Submission file is not valid JSON");
                None
            }
        }
    }

    /// Persist the per-file audit row mirroring the response data.
    async fn record_contribution_row(
        &self,
        outcome: &FileOutcome,
        errors: &[ErrorCode],
    ) -> Result<()> {
        let quality = scoring::quality_score(outcome.raw_count);
        let uniqueness =
            scoring::uniqueness_score(outcome.stats.inserted, outcome.stats.duplicates);
        let score = scoring::composite_score(quality, uniqueness);

        let contribution = Contribution {
            wallet_address: self.wallet,
            file_id: self.config.node.file_id,
            score,
            quality,
            uniqueness,
            authenticity: 0.0,
            ownership: 0.0,
            valid: errors.is_empty(),
            coordinates: outcome.raw_count,
            unique_coordinates: outcome.stats.inserted,
            errors: errors.to_vec(),
            created_at: Utc::now(),
        };
        self.store.record_contribution(&contribution).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use geoproof_ledger::{IdentityError, LedgerError};
    use geoproof_storage::{BackendType, StoreConfig};
    use geoproof_types::StorageUser;
    use serde_json::json;
    use tempfile::TempDir;

    struct StaticLedger(u64);

    #[async_trait]
    impl ContributionLedger for StaticLedger {
        async fn file_count(&self, _wallet: &WalletAddress) -> Result<u64, LedgerError> {
            Ok(self.0)
        }
    }

    struct FailingLedger;

    #[async_trait]
    impl ContributionLedger for FailingLedger {
        async fn file_count(&self, _wallet: &WalletAddress) -> Result<u64, LedgerError> {
            Err(LedgerError::Rpc("registry unavailable".to_string()))
        }
    }

    struct StaticIdentity {
        verified_email: bool,
    }

    #[async_trait]
    impl IdentityProvider for StaticIdentity {
        async fn resolve(&self, _token: &str) -> Result<StorageUser, IdentityError> {
            Ok(StorageUser {
                id: "108536543".to_string(),
                email: Some("user@example.com".to_string()),
                verified_email: self.verified_email,
            })
        }
    }

    struct RejectingIdentity;

    #[async_trait]
    impl IdentityProvider for RejectingIdentity {
        async fn resolve(&self, _token: &str) -> Result<StorageUser, IdentityError> {
            Err(IdentityError::Rejected(401))
        }
    }

    fn test_config(input_dir: &Path) -> NodeConfig {
        let mut config = NodeConfig::default();
        config.node.wallet_address = "0x0101010101010101010101010101010101010101".to_string();
        config.node.file_id = 99;
        config.input.dir = input_dir.to_path_buf();
        config.identity.token = Some("test-token".to_string());
        config.storage.backend = "memory".to_string();
        config
    }

    fn memory_store() -> DedupStore {
        DedupStore::new(StoreConfig {
            backend_type: BackendType::Memory,
        })
        .unwrap()
    }

    fn engine_with(
        config: NodeConfig,
        store: DedupStore,
        ledger: Arc<dyn ContributionLedger>,
        identity: Arc<dyn IdentityProvider>,
    ) -> ProofEngine {
        ProofEngine::new(config, store, ledger, identity).unwrap()
    }

    fn write_android_file(dir: &Path, name: &str, count: usize) {
        let segments: Vec<_> = (0..count)
            .map(|i| {
                json!({
                    "timelinePath": [
                        {"point": format!("{:.6},{:.6}", 37.0 + i as f64 * 0.001, -122.0 - i as f64 * 0.001)}
                    ]
                })
            })
            .collect();
        let payload = json!({ "semanticSegments": segments });
        std::fs::write(dir.join(name), payload.to_string()).unwrap();
    }

    #[tokio::test]
    async fn test_android_submission_scores_against_empty_store() {
        let dir = TempDir::new().unwrap();
        write_android_file(dir.path(), "export.json", 150);

        let engine = engine_with(
            test_config(dir.path()),
            memory_store(),
            Arc::new(StaticLedger(0)),
            Arc::new(StaticIdentity {
                verified_email: true,
            }),
        );
        let response = engine.generate().await.unwrap();

        assert!(response.valid);
        assert_eq!(response.uniqueness, 1.0);
        let expected_quality = scoring::quality_score(150);
        assert!((response.quality - expected_quality).abs() < 1e-12);
        let expected_score = 0.5 * expected_quality + 0.5;
        assert!((response.score - expected_score).abs() < 1e-12);

        assert_eq!(response.attributes["coordinates"], json!(150));
        assert_eq!(response.attributes["unique_coordinates"], json!(150));
        assert_eq!(
            response.attributes["schema_type"],
            json!("google-timeline-android.json")
        );
        assert!(!response.attributes.contains_key("errors"));
    }

    #[tokio::test]
    async fn test_prior_contributions_invalidate_the_run() {
        let dir = TempDir::new().unwrap();
        write_android_file(dir.path(), "export.json", 150);

        let engine = engine_with(
            test_config(dir.path()),
            memory_store(),
            Arc::new(StaticLedger(3)),
            Arc::new(StaticIdentity {
                verified_email: true,
            }),
        );
        let response = engine.generate().await.unwrap();

        assert!(!response.valid);
        // Score is still computed; only the verdict flips.
        assert!(response.score > 0.5);
        assert_eq!(
            response.attributes["errors"],
            json!(["DUPLICATE_CONTRIBUTION"])
        );
    }

    #[tokio::test]
    async fn test_missing_token_appends_code_but_continues() {
        let dir = TempDir::new().unwrap();
        write_android_file(dir.path(), "export.json", 150);

        let mut config = test_config(dir.path());
        config.identity.token = None;

        let engine = engine_with(
            config,
            memory_store(),
            Arc::new(StaticLedger(0)),
            Arc::new(StaticIdentity {
                verified_email: true,
            }),
        );
        let response = engine.generate().await.unwrap();

        assert!(!response.valid);
        assert_eq!(
            response.attributes["errors"],
            json!(["MISSING_STORAGE_TOKEN"])
        );
        // The file itself was still processed.
        assert_eq!(response.attributes["coordinates"], json!(150));
    }

    #[tokio::test]
    async fn test_unresolvable_identity_flags_unverified_user() {
        let dir = TempDir::new().unwrap();
        write_android_file(dir.path(), "export.json", 150);

        let engine = engine_with(
            test_config(dir.path()),
            memory_store(),
            Arc::new(StaticLedger(0)),
            Arc::new(RejectingIdentity),
        );
        let response = engine.generate().await.unwrap();

        assert!(!response.valid);
        assert_eq!(
            response.attributes["errors"],
            json!(["UNVERIFIED_STORAGE_USER"])
        );
    }

    #[tokio::test]
    async fn test_unverified_email_flags_code() {
        let dir = TempDir::new().unwrap();
        write_android_file(dir.path(), "export.json", 150);

        let engine = engine_with(
            test_config(dir.path()),
            memory_store(),
            Arc::new(StaticLedger(0)),
            Arc::new(StaticIdentity {
                verified_email: false,
            }),
        );
        let response = engine.generate().await.unwrap();

        assert!(!response.valid);
        assert_eq!(
            response.attributes["errors"],
            json!(["UNVERIFIED_STORAGE_EMAIL"])
        );
    }

    #[tokio::test]
    async fn test_ledger_failure_fails_open() {
        let dir = TempDir::new().unwrap();
        write_android_file(dir.path(), "export.json", 150);

        let engine = engine_with(
            test_config(dir.path()),
            memory_store(),
            Arc::new(FailingLedger),
            Arc::new(StaticIdentity {
                verified_email: true,
            }),
        );
        let response = engine.generate().await.unwrap();

        // No DUPLICATE_CONTRIBUTION: the failure degrades to zero priors.
        assert!(response.valid);
    }

    #[tokio::test]
    async fn test_invalid_schema_never_aborts_the_batch() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("a_broken.json"),
            json!({"wrong": "shape"}).to_string(),
        )
        .unwrap();
        write_android_file(dir.path(), "b_valid.json", 150);

        let store = memory_store();
        let engine = engine_with(
            test_config(dir.path()),
            store.clone(),
            Arc::new(StaticLedger(0)),
            Arc::new(StaticIdentity {
                verified_email: true,
            }),
        );
        let response = engine.generate().await.unwrap();

        assert!(!response.valid);
        assert_eq!(response.attributes["errors"], json!(["INVALID_SCHEMA"]));
        // The second file was still extracted and deduplicated.
        assert_eq!(response.attributes["coordinates"], json!(150));
        assert_eq!(store.coordinate_count().await.unwrap(), 150);
    }

    #[tokio::test]
    async fn test_small_file_flags_not_enough_data() {
        let dir = TempDir::new().unwrap();
        write_android_file(dir.path(), "export.json", 10);

        let engine = engine_with(
            test_config(dir.path()),
            memory_store(),
            Arc::new(StaticLedger(0)),
            Arc::new(StaticIdentity {
                verified_email: true,
            }),
        );
        let response = engine.generate().await.unwrap();

        assert!(!response.valid);
        assert_eq!(response.attributes["errors"], json!(["NOT_ENOUGH_DATA"]));
        assert_eq!(response.quality, 0.0);
    }

    #[tokio::test]
    async fn test_resubmission_collapses_to_duplicates() {
        let dir = TempDir::new().unwrap();
        write_android_file(dir.path(), "export.json", 150);

        let store = memory_store();
        let config = test_config(dir.path());
        let first = engine_with(
            config.clone(),
            store.clone(),
            Arc::new(StaticLedger(0)),
            Arc::new(StaticIdentity {
                verified_email: true,
            }),
        );
        let response = first.generate().await.unwrap();
        assert_eq!(response.uniqueness, 1.0);

        let second = engine_with(
            config,
            store.clone(),
            Arc::new(StaticLedger(0)),
            Arc::new(StaticIdentity {
                verified_email: true,
            }),
        );
        let response = second.generate().await.unwrap();

        assert_eq!(response.uniqueness, 0.0);
        assert_eq!(response.attributes["unique_coordinates"], json!(0));
        assert!(response.score < 0.01);
    }

    #[tokio::test]
    async fn test_contribution_rows_are_persisted() {
        let dir = TempDir::new().unwrap();
        write_android_file(dir.path(), "export.json", 150);

        let store = memory_store();
        let config = test_config(dir.path());
        let wallet = config.wallet().unwrap();
        let engine = engine_with(
            config,
            store.clone(),
            Arc::new(StaticLedger(0)),
            Arc::new(StaticIdentity {
                verified_email: true,
            }),
        );
        engine.generate().await.unwrap();

        let rows = store.contributions_for(&wallet).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file_id, 99);
        assert_eq!(rows[0].coordinates, 150);
        assert_eq!(rows[0].unique_coordinates, 150);
        assert!(rows[0].valid);
        assert!(rows[0].errors.is_empty());
    }

    #[tokio::test]
    async fn test_non_json_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a submission").unwrap();
        write_android_file(dir.path(), "export.JSON", 150);

        let engine = engine_with(
            test_config(dir.path()),
            memory_store(),
            Arc::new(StaticLedger(0)),
            Arc::new(StaticIdentity {
                verified_email: true,
            }),
        );
        let response = engine.generate().await.unwrap();

        // The .txt file is skipped, the uppercase .JSON one is processed.
        assert!(response.valid);
        assert_eq!(response.attributes["coordinates"], json!(150));
    }
}
