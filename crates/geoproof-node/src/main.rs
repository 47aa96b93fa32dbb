use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geoproof_ledger::{OAuthIdentityClient, RpcLedgerClient};
use geoproof_node::config::NodeConfig;
use geoproof_node::engine::ProofEngine;
use geoproof_node::logging;
use geoproof_storage::{BackendType, DedupStore, StoreConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "geoproof")]
#[command(about = "Geoproof - Proof-of-Contribution Validator", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a proof over a directory of submission files
    Run {
        /// Input directory (overrides config)
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        /// Write the proof response to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a default configuration file
    Init {
        /// Output directory for configuration
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (ignore if it doesn't)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    config.apply_env_overrides();
    logging::init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Run { input_dir, output } => run_proof(config, input_dir, output).await,
        Commands::Init { output } => init_config(&output),
    }
}

fn load_config(path: Option<&Path>) -> Result<NodeConfig> {
    if let Some(path) = path {
        NodeConfig::from_file(path)
    } else if Path::new("./geoproof.toml").exists() {
        NodeConfig::from_file(Path::new("./geoproof.toml"))
    } else {
        Ok(NodeConfig::default())
    }
}

async fn run_proof(
    mut config: NodeConfig,
    input_dir: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    if let Some(dir) = input_dir {
        config.input.dir = dir;
    }
    config.validate()?;

    let store = DedupStore::new(StoreConfig {
        backend_type: select_backend(&config),
    })?;

    let ledger = Arc::new(RpcLedgerClient::new(
        config.ledger.rpc_url.clone(),
        config.ledger.contract_address.clone(),
        Some(Duration::from_secs(config.ledger.timeout_secs)),
    )?);
    let identity = Arc::new(OAuthIdentityClient::new(config.identity.userinfo_url.clone())?);

    let engine = ProofEngine::new(config, store.clone(), ledger, identity)?;
    let response = engine.generate().await?;
    store.flush().await?;

    let rendered =
        serde_json::to_string_pretty(&response).context("serializing proof response")?;
    match output {
        Some(path) => {
            std::fs::write(&path, &rendered)
                .with_context(|| format!("writing proof response to {}", path.display()))?;
            info!(path = %path.display(), valid = response.valid, "Proof response written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn select_backend(config: &NodeConfig) -> BackendType {
    match config.storage.backend.as_str() {
        "rocksdb" => {
            #[cfg(feature = "rocksdb")]
            {
                BackendType::RocksDb {
                    path: config
                        .node
                        .data_dir
                        .join("dedup")
                        .to_string_lossy()
                        .to_string(),
                }
            }
            #[cfg(not(feature = "rocksdb"))]
            {
                warn!("RocksDB backend requested but feature not enabled, falling back to memory");
                BackendType::Memory
            }
        }
        "memory" => BackendType::Memory,
        other => {
            warn!(backend = other, "Unknown storage backend, falling back to memory");
            BackendType::Memory
        }
    }
}

fn init_config(output: &Path) -> Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("creating output directory {}", output.display()))?;
    let path = output.join("geoproof.toml");
    NodeConfig::default().to_file(&path)?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}
