//! faceswipe-server library interface
//!
//! Exposes the router, state, and services for integration testing.

pub mod api;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use faceswipe_common::config::Config;
use faceswipe_common::store::Store;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::extractor::FeatureExtractor;

/// Largest accepted upload body
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across handlers and the background producer
#[derive(Clone)]
pub struct AppState {
    /// Flat-file collections
    pub store: Arc<Store>,
    /// Feature-extraction capability
    pub extractor: Arc<dyn FeatureExtractor>,
    /// Resolved configuration
    pub config: Arc<Config>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(store: Store, extractor: Arc<dyn FeatureExtractor>, config: Config) -> Self {
        Self {
            store: Arc::new(store),
            extractor,
            config: Arc::new(config),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Record an error message for the health endpoint
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let uploads_dir = state.config.uploads_dir.clone();

    Router::new()
        .merge(api::auth_routes())
        .merge(api::feed_routes())
        .merge(api::interaction_routes())
        .merge(api::image_routes())
        .merge(api::stats_routes())
        .merge(api::health_routes())
        // Uploaded/generated images are served as static files
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
