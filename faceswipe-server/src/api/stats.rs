//! Per-user model stats and debug counts

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use faceswipe_common::models::InteractionAction;
use serde::Serialize;

use crate::{ApiError, ApiResult, AppState};

/// Interactions required before the per-user "model" counts as trained.
/// There is no real model behind this; it is a fixed threshold.
const MODEL_TRAINED_THRESHOLD: usize = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatsResponse {
    pub total_interactions: usize,
    pub likes: usize,
    pub dislikes: usize,
    pub uploaded_images: usize,
    pub model_exists: bool,
}

/// GET /api/model-stats/:user_id
pub async fn model_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ModelStatsResponse>> {
    let users = state.store.users.read().await;
    if !users.iter().any(|u| u.id == user_id) {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let interactions = state.store.interactions.read().await;
    let images = state.store.images.read().await;

    let user_interactions: Vec<_> = interactions.iter().filter(|i| i.user_id == user_id).collect();
    let likes = user_interactions
        .iter()
        .filter(|i| i.action == InteractionAction::Like)
        .count();
    let dislikes = user_interactions
        .iter()
        .filter(|i| i.action == InteractionAction::Dislike)
        .count();
    let total_interactions = user_interactions.len();
    let uploaded_images = images.iter().filter(|i| i.uploader_id == user_id).count();

    Ok(Json(ModelStatsResponse {
        total_interactions,
        likes,
        dislikes,
        uploaded_images,
        model_exists: total_interactions >= MODEL_TRAINED_THRESHOLD,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugResponse {
    pub users: usize,
    pub images: usize,
    pub interactions: usize,
    pub ai_images: usize,
    pub user_images: usize,
}

/// GET /api/debug
pub async fn debug_counts(State(state): State<AppState>) -> Json<DebugResponse> {
    let users = state.store.users.read().await;
    let images = state.store.images.read().await;
    let interactions = state.store.interactions.read().await;

    let ai_images = images.iter().filter(|i| i.is_ai).count();

    Json(DebugResponse {
        users: users.len(),
        images: images.len(),
        interactions: interactions.len(),
        ai_images,
        user_images: images.len() - ai_images,
    })
}

/// Build stats routes
pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/api/model-stats/:user_id", get(model_stats))
        .route("/api/debug", get(debug_counts))
}
