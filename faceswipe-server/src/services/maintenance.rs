//! Startup maintenance pass
//!
//! The collections tolerate inconsistency at write time (no cross-file
//! transaction); this pass repairs it on startup. Two stages:
//! 1. Drop malformed or test-fixture image records, then drop interactions
//!    whose image no longer exists.
//! 2. Back-fill features for images whose stored value is absent or
//!    error-shaped.
//!
//! All failures here are logged and absorbed; startup continues regardless.

use faceswipe_common::models::Image;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::services::extractor::needs_extraction;
use crate::AppState;

pub async fn run(state: &AppState) {
    clean_up_images(state).await;
    backfill_features(state).await;
}

fn is_valid(image: &Image) -> bool {
    if image.id.is_empty() || image.filename.is_empty() || image.path.is_empty() {
        return false;
    }
    // Test fixtures carry a {"test": true} marker instead of real features
    image.features.get("test") != Some(&Value::Bool(true))
}

/// Remove malformed/test images and interactions referencing missing images
async fn clean_up_images(state: &AppState) {
    info!("Cleaning up test or invalid images...");

    let images = state.store.images.read().await;
    let interactions = state.store.interactions.read().await;

    let valid_images: Vec<Image> = images.iter().filter(|i| is_valid(i)).cloned().collect();
    let valid_ids: HashSet<&str> = valid_images.iter().map(|i| i.id.as_str()).collect();
    let valid_interactions: Vec<_> = interactions
        .iter()
        .filter(|i| valid_ids.contains(i.image_id.as_str()))
        .cloned()
        .collect();

    let dropped_images = images.len() - valid_images.len();
    let dropped_interactions = interactions.len() - valid_interactions.len();
    if dropped_images == 0 && dropped_interactions == 0 {
        info!("No cleanup needed");
        return;
    }

    if let Err(e) = state.store.images.write(&valid_images).await {
        warn!("Image cleanup write failed: {}", e);
        return;
    }
    if let Err(e) = state.store.interactions.write(&valid_interactions).await {
        warn!("Interaction cleanup write failed: {}", e);
        return;
    }
    info!(
        "Cleaned up {} invalid images and {} orphaned interactions",
        dropped_images, dropped_interactions
    );
}

/// Re-run extraction for images with missing or error-shaped features
async fn backfill_features(state: &AppState) {
    info!("Checking for images with missing features...");

    let mut images = state.store.images.read().await;
    let mut updated = false;

    for image in images.iter_mut() {
        if !needs_extraction(&image.features) {
            continue;
        }
        info!("Updating features for image: {}", image.filename);
        let path = state.config.uploads_dir.join(&image.filename);
        image.features = state.extractor.extract_or_fallback(&path).await;
        updated = true;
    }

    if !updated {
        info!("No images needed feature updates");
        return;
    }
    match state.store.images.write(&images).await {
        Ok(()) => info!("Updated images with missing features"),
        Err(e) => warn!("Feature backfill write failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extractor::{ExtractError, FeatureExtractor};
    use crate::AppState;
    use async_trait::async_trait;
    use chrono::Utc;
    use faceswipe_common::config::Config;
    use faceswipe_common::models::{Interaction, InteractionAction};
    use faceswipe_common::store::Store;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct FixedExtractor(Value);

    #[async_trait]
    impl FeatureExtractor for FixedExtractor {
        async fn extract(&self, _image: &Path) -> Result<Value, ExtractError> {
            Ok(self.0.clone())
        }
    }

    fn image(id: &str, features: Value) -> Image {
        Image {
            id: id.to_string(),
            filename: format!("{}.jpg", id),
            original_name: format!("{}.jpg", id),
            path: format!("/uploads/{}.jpg", id),
            uploader_id: "system".to_string(),
            upload_timestamp: Utc::now().to_rfc3339(),
            is_ai: true,
            likeness_probability: Some(0.5),
            features,
        }
    }

    fn interaction(id: &str, image_id: &str) -> Interaction {
        Interaction {
            id: id.to_string(),
            user_id: "u1".to_string(),
            image_id: image_id.to_string(),
            action: InteractionAction::Like,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    fn test_state(dir: &TempDir, extracted: Value) -> AppState {
        let config = Config {
            data_dir: dir.path().join("data"),
            uploads_dir: dir.path().join("uploads"),
            ..Config::default()
        };
        std::fs::create_dir_all(&config.uploads_dir).unwrap();
        let store = Store::open(&config.data_dir).unwrap();
        AppState::new(store, Arc::new(FixedExtractor(extracted)), config)
    }

    #[tokio::test]
    async fn test_cleanup_drops_test_images_and_orphans() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, json!({"has_face": true}));

        state
            .store
            .images
            .write(&[
                image("good", json!({"has_face": true})),
                image("fixture", json!({"test": true})),
            ])
            .await
            .unwrap();
        state
            .store
            .interactions
            .write(&[
                interaction("i1", "good"),
                interaction("i2", "fixture"),
                interaction("i3", "long-gone"),
            ])
            .await
            .unwrap();

        run(&state).await;

        let images = state.store.images.read().await;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id, "good");

        let interactions = state.store.interactions.read().await;
        assert_eq!(interactions.len(), 1);
        assert_eq!(interactions[0].image_id, "good");
    }

    #[tokio::test]
    async fn test_backfill_replaces_error_features() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, json!({"has_face": true, "face_count": 1}));

        state
            .store
            .images
            .write(&[
                image("broken", json!({"error": "Feature extraction failed"})),
                image("fine", json!({"has_face": false})),
            ])
            .await
            .unwrap();

        run(&state).await;

        let images = state.store.images.read().await;
        assert_eq!(images[0].features["has_face"], true);
        // Healthy features are left alone
        assert_eq!(images[1].features, json!({"has_face": false}));
    }
}
