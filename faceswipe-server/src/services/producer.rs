//! Background AI image producer
//!
//! Fetches a face image from the configured external source, saves it under
//! the uploads directory, runs feature extraction, and registers the result
//! in the image collection. Runs once shortly after startup and then on a
//! fixed interval; a tick that outlasts the interval skips the overlapped
//! ticks instead of stacking up.

use chrono::{SecondsFormat, Utc};
use faceswipe_common::models::{Image, SYSTEM_UPLOADER};
use faceswipe_common::{ids, Error, Result};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::AppState;

/// Run one full generation cycle: fetch, save, extract, register.
///
/// Fetch and save failures abandon the attempt and leave the image
/// collection unchanged. Extraction failure does not block registration; the
/// image is registered with the fallback feature shape.
pub async fn generate_once(state: &AppState) -> Result<Image> {
    let filename = ids::unique_filename("ai-face", ".jpg");
    let filepath = state.config.uploads_dir.join(&filename);

    info!("Generating AI image: {}", filename);

    let response = reqwest::get(&state.config.image_source_url)
        .await
        .map_err(|e| Error::Internal(format!("Failed to fetch image: {}", e)))?;
    if !response.status().is_success() {
        return Err(Error::Internal(format!(
            "Failed to fetch image: {}",
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Internal(format!("Failed to read image body: {}", e)))?;

    tokio::fs::write(&filepath, &bytes).await?;
    if bytes.is_empty() {
        let _ = tokio::fs::remove_file(&filepath).await;
        return Err(Error::Internal("Downloaded file is empty".to_string()));
    }
    info!("Image saved: {} ({} bytes)", filename, bytes.len());

    let features = state.extractor.extract_or_fallback(&filepath).await;

    let image = Image {
        id: ids::prefixed_id("ai"),
        filename: filename.clone(),
        original_name: "AI Generated Face".to_string(),
        path: format!("/uploads/{}", filename),
        uploader_id: SYSTEM_UPLOADER.to_string(),
        upload_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        is_ai: true,
        likeness_probability: Some(0.5 + rand::random::<f64>() * 0.5),
        features,
    };

    let registered = image.clone();
    state
        .store
        .images
        .update(move |images| images.push(image))
        .await?;

    info!("Registered image: {}", filename);
    Ok(registered)
}

/// Periodic generation loop. Never returns; intended for `tokio::spawn`.
pub async fn run(state: AppState) {
    let delay = Duration::from_secs(state.config.generation_startup_delay_secs);
    let period = Duration::from_secs(state.config.generation_interval_secs);

    // First image shortly after startup, then on the fixed interval
    tokio::time::sleep(delay).await;
    info!(
        "Started AI image auto-generation (every {}s)",
        period.as_secs()
    );

    let mut tick = interval(period);
    // Single-flight: a run that outlasts the interval drops the missed ticks
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tick.tick().await;
        match generate_once(&state).await {
            Ok(image) => info!("Auto-generation completed: {}", image.id),
            Err(e) => {
                warn!("Auto-generation failed: {}", e);
                state
                    .record_error(format!("AI generation failed: {}", e))
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extractor::{ExtractError, FeatureExtractor};
    use async_trait::async_trait;
    use axum::routing::get;
    use axum::Router;
    use faceswipe_common::config::Config;
    use faceswipe_common::store::Store;
    use serde_json::{json, Value};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct StubExtractor {
        /// `None` simulates an extraction failure
        features: Option<Value>,
    }

    #[async_trait]
    impl FeatureExtractor for StubExtractor {
        async fn extract(&self, _image: &Path) -> std::result::Result<Value, ExtractError> {
            match &self.features {
                Some(value) => Ok(value.clone()),
                None => Err(ExtractError::EmptyOutput),
            }
        }
    }

    /// Serve `router` on an ephemeral port, returning its base URL
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn test_state(dir: &TempDir, source_url: String, features: Option<Value>) -> AppState {
        let config = Config {
            data_dir: dir.path().join("data"),
            uploads_dir: dir.path().join("uploads"),
            image_source_url: source_url,
            ..Config::default()
        };
        std::fs::create_dir_all(&config.uploads_dir).unwrap();
        let store = Store::open(&config.data_dir).unwrap();
        AppState::new(store, Arc::new(StubExtractor { features }), config)
    }

    #[tokio::test]
    async fn test_generate_registers_image() {
        let dir = TempDir::new().unwrap();
        let url = serve(Router::new().route("/", get(|| async { "fake image bytes" }))).await;
        let state = test_state(&dir, url, Some(json!({"has_face": true})));

        let image = generate_once(&state).await.unwrap();
        assert!(image.is_ai);
        assert_eq!(image.uploader_id, "system");
        assert!(image.id.starts_with("ai-"));
        let p = image.likeness_probability.unwrap();
        assert!((0.5..=1.0).contains(&p));
        assert_eq!(image.features["has_face"], true);

        // Saved on disk and registered in the collection
        assert!(state.config.uploads_dir.join(&image.filename).exists());
        assert_eq!(state.store.images.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_extraction_failure_still_registers() {
        let dir = TempDir::new().unwrap();
        let url = serve(Router::new().route("/", get(|| async { "fake image bytes" }))).await;
        let state = test_state(&dir, url, None);

        let image = generate_once(&state).await.unwrap();
        assert_eq!(image.features["has_face"], false);
        assert!(image.features["error"].is_string());
        assert_eq!(state.store.images.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_non_200_fetch_leaves_collection_unchanged() {
        let dir = TempDir::new().unwrap();
        // No routes: every request is a 404
        let url = serve(Router::new()).await;
        let state = test_state(&dir, url, Some(json!({})));

        let result = generate_once(&state).await;
        assert!(result.is_err());
        assert_eq!(state.store.images.read().await.len(), 0);
    }

    #[tokio::test]
    async fn test_empty_body_abandoned_and_file_removed() {
        let dir = TempDir::new().unwrap();
        let url = serve(Router::new().route("/", get(|| async { "" }))).await;
        let state = test_state(&dir, url, Some(json!({})));

        let result = generate_once(&state).await;
        assert!(result.is_err());
        assert_eq!(state.store.images.read().await.len(), 0);
        // No stray empty files left in uploads
        let leftover = std::fs::read_dir(&state.config.uploads_dir).unwrap().count();
        assert_eq!(leftover, 0);
    }
}
