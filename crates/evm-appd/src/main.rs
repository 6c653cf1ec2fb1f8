//! どこで: node入口 / 何を: flag解釈と起動順序 / なぜ: keystore→genesis→両サーバの順を一点で守るため

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use evm_core::{genesis, Engine};
use evm_db::MemDb;
use evm_rpc::driver::DriverClient;
use evm_rpc::keystore::Keystore;
use evm_rpc::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application-side EVM execution engine for a BFT consensus driver.
#[derive(Debug, Parser)]
#[command(name = "evm-appd", version)]
struct Cli {
    /// Data directory for the keystore and genesis file
    #[arg(long, default_value = "data")]
    datadir: PathBuf,

    /// Application protocol listen address
    #[arg(long = "addr", default_value = "tcp://0.0.0.0:46658")]
    app_addr: String,

    /// IP:Port to bind the HTTP API on
    #[arg(long, default_value = ":8080")]
    apiaddr: String,

    /// Consensus driver RPC endpoint for outbound submissions
    #[arg(long, default_value = "http://127.0.0.1:46657")]
    driver_rpc: String,

    /// IP:Port the consensus driver binds its P2P endpoint on
    #[arg(long, default_value = "tcp://0.0.0.0:46656")]
    node_laddr: String,

    /// Comma delimited host:port seed nodes
    #[arg(long, default_value = "")]
    seeds: String,

    /// Disable fast blockchain syncing
    #[arg(long)]
    no_fast_sync: bool,

    /// Skip UPNP configuration
    #[arg(long)]
    skip_upnp: bool,

    /// Log filter (tracing syntax)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Password used to unlock every keystore account at startup
    #[arg(long, default_value = "x")]
    keystore_pass: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let runtime = tokio::runtime::Runtime::new().context("building runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let store = Arc::new(MemDb::new());
    let engine = Arc::new(Engine::new(store));

    let keystore = Keystore::load(&cli.datadir.join("keystore"), &cli.keystore_pass)
        .map_err(|err| anyhow::anyhow!("keystore: {err:?}"))?;
    info!(accounts = keystore.len(), "keystore unlocked");

    let genesis_path = cli.datadir.join("genesis.json");
    let seeds = genesis::load(&genesis_path)
        .map_err(|err| anyhow::anyhow!("genesis {}: {err:?}", genesis_path.display()))?;
    let root = engine
        .create_accounts(&seeds)
        .map_err(|err| anyhow::anyhow!("installing genesis accounts: {err:?}"))?;
    info!(accounts = seeds.len(), %root, "genesis installed");

    // The driver runs as a peer process; these settings are advertised for
    // its configuration and consumed nowhere else.
    info!(
        node_laddr = %cli.node_laddr,
        seeds = %cli.seeds,
        fast_sync = !cli.no_fast_sync,
        skip_upnp = cli.skip_upnp,
        "driver settings"
    );

    let state = AppState::new(
        Arc::clone(&engine),
        Arc::new(keystore),
        DriverClient::new(cli.driver_rpc.clone()),
    );

    let app = evm_app::serve(&cli.app_addr, Arc::clone(&engine));
    let api = evm_rpc::serve(&cli.apiaddr, state);
    tokio::select! {
        result = app => result.context("application protocol server"),
        result = api => result.context("http api server"),
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level)
        .with_context(|| format!("invalid log level {log_level:?}"))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
