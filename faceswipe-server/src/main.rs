//! faceswipe-server - Swipe-on-faces demo backend
//!
//! REST API over three flat-file JSON collections, a background producer
//! fetching AI-generated face images, and a subprocess feature-extraction
//! adapter.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use faceswipe_common::config::Config;
use faceswipe_common::store::Store;
use faceswipe_server::services::extractor::ScriptExtractor;
use faceswipe_server::services::{maintenance, producer};
use faceswipe_server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting faceswipe-server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    info!("Data dir: {}", config.data_dir.display());
    info!("Uploads dir: {}", config.uploads_dir.display());

    std::fs::create_dir_all(&config.uploads_dir)?;
    let store = Store::open(&config.data_dir)?;

    let extractor = Arc::new(ScriptExtractor::new(
        config.extractor_script.clone(),
        config.python_bin.clone(),
        Duration::from_secs(config.extractor_timeout_secs),
    ));

    let port = config.port;
    let state = AppState::new(store, extractor, config);

    // Repair collections before serving traffic
    maintenance::run(&state).await;

    // Periodic AI image generation
    tokio::spawn(producer::run(state.clone()));

    let app = faceswipe_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on http://0.0.0.0:{}", port);
    info!("Health check: http://localhost:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
