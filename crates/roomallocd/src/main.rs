//! roomallocd — the RoomAlloc daemon.
//!
//! Single binary that assembles the allocation engine:
//! - State store (redb)
//! - Round orchestrator + scheduler
//! - Query service
//! - REST API
//!
//! # Usage
//!
//! ```text
//! roomallocd serve --port 8470 --data-dir /var/lib/roomalloc --seed spring.toml
//! roomallocd run --round 1
//! roomallocd seed --file spring.json
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use roomalloc_api::{ApiState, build_router};
use roomalloc_core::AllocConfig;
use roomalloc_round::RoundOrchestrator;
use roomalloc_state::{Dataset, StateStore};

#[derive(Parser)]
#[command(name = "roomallocd", about = "RoomAlloc daemon")]
struct Cli {
    /// Path to roomalloc.toml. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for persistent state (overrides the config file).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the REST API.
    Serve {
        /// Port to listen on.
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind.
        #[arg(long)]
        bind: Option<String>,

        /// Dataset (JSON or TOML) to load before serving.
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Run one allocation pass to completion and print the round status.
    Run {
        /// Allocation round number.
        #[arg(long)]
        round: u64,

        /// Dataset (JSON or TOML) to load before running.
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Load a dataset into the store and exit.
    Seed {
        /// Dataset file (JSON or TOML).
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AllocConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AllocConfig::default(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.store.data_dir = data_dir;
    }

    init_tracing(&config)?;

    match cli.command {
        Command::Serve { port, bind, seed } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            run_server(config).await
        }
        Command::Run { round, seed } => {
            if seed.is_some() {
                config.seed = seed;
            }
            run_round(config, round).await
        }
        Command::Seed { file } => {
            let store = open_store(&config)?;
            seed_store(&store, &file)
        }
    }
}

fn init_tracing(config: &AllocConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log.filter)
            .with_context(|| format!("invalid log filter {:?}", config.log.filter))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn open_store(config: &AllocConfig) -> anyhow::Result<StateStore> {
    std::fs::create_dir_all(&config.store.data_dir).with_context(|| {
        format!(
            "failed to create data directory {}",
            config.store.data_dir.display()
        )
    })?;
    let db_path = config.store.db_path();
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");
    Ok(store)
}

fn seed_store(store: &StateStore, path: &Path) -> anyhow::Result<()> {
    let dataset = Dataset::from_file(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    store.load_dataset(&dataset)?;
    info!(path = %path.display(), "dataset loaded");
    Ok(())
}

/// Open the store and apply the configured seed, if any.
fn prepare_store(config: &AllocConfig) -> anyhow::Result<Arc<StateStore>> {
    let store = open_store(config)?;
    if let Some(seed) = &config.seed {
        seed_store(&store, seed)?;
    }
    Ok(Arc::new(store))
}

async fn run_server(config: AllocConfig) -> anyhow::Result<()> {
    info!("RoomAlloc daemon starting");

    let store = prepare_store(&config)?;
    let state = ApiState::new(store);
    let orchestrator = state.orchestrator.clone();

    // ── Start API server ───────────────────────────────────────

    let ip = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {:?}", config.server.bind))?;
    let addr = SocketAddr::new(ip, config.server.port);
    let router = build_router(state);

    info!(%addr, "API server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Running rounds keep their committed records and end up Aborted.
    orchestrator.shutdown().await;

    info!("RoomAlloc daemon stopped");
    Ok(())
}

async fn run_round(config: AllocConfig, round_id: u64) -> anyhow::Result<()> {
    let store = prepare_store(&config)?;
    let orchestrator = RoundOrchestrator::new(store);

    orchestrator.start(round_id).await?;

    let phase = tokio::select! {
        phase = orchestrator.join(round_id) => phase?,
        _ = shutdown_signal() => {
            if let Err(e) = orchestrator.abort(round_id).await {
                // The pass may have finished while the signal arrived.
                warn!(round_id, error = %e, "abort not delivered");
            }
            orchestrator.join(round_id).await?
        }
    };
    info!(round_id, %phase, "allocation pass finished");

    let status = orchestrator.status(round_id).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
