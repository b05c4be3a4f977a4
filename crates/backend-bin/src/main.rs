// ============================
// chat-backend-bin/src/main.rs
// ============================
//! Process bootstrap: config, tracing, store, listener.

use std::sync::Arc;

use anyhow::Context;
use chat_backend_lib::{config::Settings, store::FlatFileStore, ws_router, AppState};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Real-time chat server")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = Settings::load_from(&args.config).context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone())),
        )
        .init();

    let store = FlatFileStore::open(&settings.data_dir)
        .with_context(|| format!("opening message store at {}", settings.data_dir.display()))?;

    let bind_addr = settings.bind_addr;
    let state = AppState::new(Arc::new(store), settings);
    let app = ws_router::create_router(state);

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!(%bind_addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
