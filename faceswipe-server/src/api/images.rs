//! Image upload and manual AI generation endpoints

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use faceswipe_common::ids;
use faceswipe_common::models::Image;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info};

use crate::services::producer;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub message: String,
    pub image: Image,
}

/// POST /api/generate
///
/// Runs one producer cycle synchronously.
pub async fn generate(State(state): State<AppState>) -> ApiResult<Json<ImageResponse>> {
    info!("Manually generating AI image...");
    match producer::generate_once(&state).await {
        Ok(image) => Ok(Json(ImageResponse {
            message: "AI image generated".to_string(),
            image,
        })),
        Err(e) => {
            error!("Manual generation failed: {}", e);
            state
                .record_error(format!("AI generation failed: {}", e))
                .await;
            Err(ApiError::Internal("Failed to generate AI image".to_string()))
        }
    }
}

/// POST /api/upload (multipart: `userId` field + `image` file)
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ImageResponse>> {
    let mut user_id: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("userId") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?;
                user_id = Some(value);
            }
            Some("image") => {
                let original_name = field
                    .file_name()
                    .unwrap_or("upload")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?;
                file = Some((original_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let user_id = match user_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Err(ApiError::BadRequest("User ID is required".to_string())),
    };
    let (original_name, bytes) = match file {
        Some(file) => file,
        None => return Err(ApiError::BadRequest("No file uploaded".to_string())),
    };

    let ext = Path::new(&original_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let filename = ids::unique_filename("image", &ext);
    let filepath = state.config.uploads_dir.join(&filename);
    tokio::fs::write(&filepath, &bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save upload: {}", e)))?;

    let features = state.extractor.extract_or_fallback(&filepath).await;

    let image = Image {
        id: ids::prefixed_id("user"),
        filename: filename.clone(),
        original_name,
        path: format!("/uploads/{}", filename),
        uploader_id: user_id,
        upload_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        is_ai: false,
        likeness_probability: None,
        features,
    };

    let registered = image.clone();
    state
        .store
        .images
        .update(move |images| images.push(image))
        .await?;

    info!("Image uploaded: {}", filename);
    Ok(Json(ImageResponse {
        message: "Image uploaded successfully".to_string(),
        image: registered,
    }))
}

/// Build image routes
pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/upload", post(upload))
}
