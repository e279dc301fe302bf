//! Duel Tetris match server (default binary).
//!
//! Serves match rooms over line-delimited JSON on TCP. Configuration comes
//! from `DUEL_*` environment variables; log verbosity from `RUST_LOG`.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use duel_tetris::adapter::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG=duel_tetris_adapter=debug for per-connection detail
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .compact()
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        ai_move_ms = config.room.ai_move.as_millis() as u64,
        seed = ?config.room.seed,
        "duel-tetris starting"
    );

    run_server(config, None).await
}
