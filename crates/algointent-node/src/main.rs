//! # Algo Intent Node
//!
//! HTTP front for the intent engine. Plans are prepared here, signed by an
//! external wallet and submitted back with the signatures.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use algointent_engine::Engine;
use algointent_ledger::{AlgodClient, HttpDexQuoter};

mod api;
mod config;
mod state;

use config::{load_config, NodeConfig};
use state::AppState;

#[derive(Debug, Parser)]
#[command(name = "algointent-node", version, about = "Intent engine HTTP node")]
struct Args {
    /// Path to a TOML config file.
    #[arg(long, env = "ALGOINTENT_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file.
    #[arg(long)]
    listen: Option<String>,
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

fn build_engine(config: &NodeConfig) -> anyhow::Result<Engine> {
    let ledger = AlgodClient::new(&config.algod).context("failed to build algod client")?;
    let mut engine = Engine::new(Arc::new(ledger), config.engine.clone());
    if let Some(dex) = &config.dex {
        let quoter = HttpDexQuoter::new(dex).context("failed to build DEX client")?;
        engine = engine.with_dex(Arc::new(quoter));
        info!("🔁 Swaps enabled via {}", dex.url);
    }
    Ok(engine)
}

/// Periodically drop held plans whose validity window has passed.
fn spawn_sweeper(state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = state.sweep().await {
                warn!("Plan sweep failed: {}", e);
            }
        }
    });
}

/// Run the node server.
pub async fn run_server(config: NodeConfig) -> anyhow::Result<()> {
    info!("🚀 Algo Intent Node starting on {}...", config.engine.network);

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("bad listen address '{}'", config.listen))?;
    let state = AppState::new(build_engine(&config)?);
    spawn_sweeper(state.clone(), Duration::from_secs(config.sweep_interval_secs));
    let app = create_router(state);

    info!("🌐 Listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router.
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health::health_check))
        // Intent API
        .route("/api/v1/intents", post(api::intent::prepare_intent))
        .route("/api/v1/plans/:id", get(api::plan::get_plan))
        .route("/api/v1/plans/:id/submit", post(api::plan::submit_plan))
        // Dry run
        .route("/api/v1/simulate", post(api::simulate::simulate_intent))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.listen = listen;
        config::validate_config(&config)?;
    }

    init_tracing(&config.log_level)?;
    run_server(config).await
}
