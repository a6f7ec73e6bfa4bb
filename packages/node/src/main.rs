//! `cloelia-node`: the Cloelia symbolic-emotion service.
//!
//! # Quick start
//!
//! ```sh
//! # In-memory node on the default port:
//! OPENAI_KEY=sk-... ELEVENLABS_KEY=... cloelia-node
//!
//! # Persistent SQLite node:
//! CLOELIA_DB=./cloelia.db cloelia-node
//!
//! # Text generation through an external bridge instead of the HTTP client:
//! CLOELIA_LLM_BRIDGE="node node_clients/gpt_bridge.mjs" cloelia-node
//! ```
//!
//! # Environment variables
//!
//! See [`NodeConfig`] for the full list. A `.env` file in the working
//! directory is read first.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use cloelia_node::{
    build_app,
    middleware::firewall::spawn_sweeper,
    reply::{generator_from_config, synthesizer_from_config},
    seed_default_virtues,
    storage::sqlite::SqliteStorage,
    MemoryStorage, NodeConfig, Storage,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloelia_node=info,tower_http=debug".into()),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = NodeConfig::from_env()?;

    let storage: Arc<dyn Storage> = match &config.db_path {
        Some(path) => {
            tracing::info!("storage: SQLite at {path}");
            Arc::new(
                SqliteStorage::open(path)
                    .map_err(|e| format!("failed to open SQLite database at {path}: {e}"))?,
            )
        }
        None => {
            tracing::info!("storage: in-memory (data will not survive restart)");
            Arc::new(MemoryStorage::new())
        }
    };

    let seeded = seed_default_virtues(storage.as_ref()).await?;
    if seeded > 0 {
        tracing::info!(seeded, "seeded default virtues");
    }

    let generator = generator_from_config(&config)?;
    let synthesizer = synthesizer_from_config(&config)?;
    tracing::info!(generator = generator.name(), "text generation ready");

    let bind_addr = config.bind_addr;
    tracing::info!(
        limit = config.rate_limit_per_minute,
        window_secs = config.rate_window_secs,
        trust_proxy = config.trust_proxy,
        "firewall configured"
    );
    let app = build_app(config, storage, generator, synthesizer)?;
    spawn_sweeper(Arc::clone(&app.tracker));

    tracing::info!("listening on {bind_addr}");
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| format!("failed to bind {bind_addr}: {e}"))?;

    axum::serve(
        listener,
        app.router
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
