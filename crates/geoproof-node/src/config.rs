use anyhow::{bail, Context, Result};
use geoproof_types::WalletAddress;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node: NodeSettings,
    pub input: InputConfig,
    pub ledger: LedgerConfig,
    pub identity: IdentityConfig,
    pub storage: StorageSettings,
    pub scoring: ScoringConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Data liquidity pool this validator scores for.
    pub dlp_id: u64,
    /// Wallet address of the submitter being scored.
    pub wallet_address: String,
    /// External identifier of the submitted file batch.
    pub file_id: u64,
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory of submission files; only `.json` entries are read.
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub contract_address: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub userinfo_url: String,
    /// OAuth token for the submitter's storage account. Usually injected
    /// via GEOPROOF_IDENTITY_TOKEN rather than written to disk.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Dedup store backend: "rocksdb" or "memory".
    pub backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Advisory cutoff echoed in response attributes; validity itself is
    /// decided by the error list, not by this threshold.
    pub score_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty", "compact" or "json".
    pub format: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node: NodeSettings {
                dlp_id: 1,
                wallet_address: String::new(),
                file_id: 0,
                data_dir: PathBuf::from("./data"),
            },
            input: InputConfig {
                dir: PathBuf::from("./input"),
            },
            ledger: LedgerConfig {
                rpc_url: "http://127.0.0.1:8545".to_string(),
                contract_address: String::new(),
                timeout_secs: 10,
            },
            identity: IdentityConfig {
                userinfo_url: geoproof_ledger::DEFAULT_USERINFO_URL.to_string(),
                token: None,
            },
            storage: StorageSettings {
                backend: "rocksdb".to_string(),
            },
            scoring: ScoringConfig {
                score_threshold: 0.9,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self).context("serializing config")?;
        std::fs::write(path, raw)
            .with_context(|| format!("writing config file {}", path.display()))?;
        Ok(())
    }

    /// Environment variables override file values so secrets and per-run
    /// parameters stay out of the config on disk.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(wallet) = std::env::var("GEOPROOF_WALLET_ADDRESS") {
            self.node.wallet_address = wallet;
        }
        if let Ok(token) = std::env::var("GEOPROOF_IDENTITY_TOKEN") {
            self.identity.token = Some(token);
        }
        if let Ok(dir) = std::env::var("GEOPROOF_INPUT_DIR") {
            self.input.dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("GEOPROOF_RPC_URL") {
            self.ledger.rpc_url = url;
        }
        if let Ok(contract) = std::env::var("GEOPROOF_DLP_CONTRACT") {
            self.ledger.contract_address = contract;
        }
        if let Ok(file_id) = std::env::var("GEOPROOF_FILE_ID") {
            match file_id.parse() {
                Ok(id) => self.node.file_id = id,
                Err(_) => warn!(value = %file_id, "Ignoring unparseable GEOPROOF_FILE_ID"),
            }
        }
        if let Ok(dlp_id) = std::env::var("GEOPROOF_DLP_ID") {
            match dlp_id.parse() {
                Ok(id) => self.node.dlp_id = id,
                Err(_) => warn!(value = %dlp_id, "Ignoring unparseable GEOPROOF_DLP_ID"),
            }
        }
    }

    /// Validate once at startup; everything downstream may then assume a
    /// well-formed configuration.
    pub fn validate(&self) -> Result<()> {
        self.wallet()?;
        if self.input.dir.as_os_str().is_empty() {
            bail!("input.dir must be set");
        }
        if self.ledger.rpc_url.is_empty() {
            bail!("ledger.rpc_url must be set");
        }
        if self.ledger.timeout_secs == 0 {
            bail!("ledger.timeout_secs must be positive");
        }
        if !(0.0..=1.0).contains(&self.scoring.score_threshold) {
            bail!(
                "scoring.score_threshold must lie in [0, 1], got {}",
                self.scoring.score_threshold
            );
        }
        match self.storage.backend.as_str() {
            "rocksdb" | "memory" => {}
            other => bail!("unknown storage backend '{}'", other),
        }
        Ok(())
    }

    pub fn wallet(&self) -> Result<WalletAddress> {
        WalletAddress::from_hex(&self.node.wallet_address)
            .with_context(|| format!("node.wallet_address '{}'", self.node.wallet_address))
    }
}
