//! Image feed endpoint
//!
//! Joins the image collection with the caller's interactions and partitions
//! into "needs action" (not yet swiped) and "action taken", both newest
//! first.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use faceswipe_common::models::{Image, InteractionAction};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::{ApiError, ApiResult, AppState};

/// Likeness probability reported when an image has none stored
const DEFAULT_LIKENESS: f64 = 0.5;

/// One feed entry: the image plus the caller's action (or null)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedImage {
    #[serde(flatten)]
    pub image: Image,
    pub user_action: Option<InteractionAction>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub needs_action: Vec<FeedImage>,
    pub action_taken: Vec<FeedImage>,
}

fn sort_key(image: &Image) -> DateTime<Utc> {
    image
        .upload_timestamp
        .parse::<DateTime<Utc>>()
        .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH)
}

/// GET /api/images/:user_id
pub async fn get_feed(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<FeedResponse>> {
    if user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("User ID is required".to_string()));
    }

    let images = state.store.images.read().await;
    let interactions = state.store.interactions.read().await;

    let user_actions: HashMap<&str, InteractionAction> = interactions
        .iter()
        .filter(|i| i.user_id == user_id)
        .map(|i| (i.image_id.as_str(), i.action))
        .collect();

    let mut needs_action = Vec::new();
    let mut action_taken = Vec::new();

    for mut image in images.into_iter() {
        let user_action = user_actions.get(image.id.as_str()).copied();
        image.likeness_probability = Some(image.likeness_probability.unwrap_or(DEFAULT_LIKENESS));

        let entry = FeedImage { image, user_action };
        if user_action.is_some() {
            action_taken.push(entry);
        } else {
            needs_action.push(entry);
        }
    }

    // Newest first in both partitions
    needs_action.sort_by(|a, b| sort_key(&b.image).cmp(&sort_key(&a.image)));
    action_taken.sort_by(|a, b| sort_key(&b.image).cmp(&sort_key(&a.image)));

    info!(
        "Sending {} needs-action and {} action-taken images to user {}",
        needs_action.len(),
        action_taken.len(),
        user_id
    );

    Ok(Json(FeedResponse {
        needs_action,
        action_taken,
    }))
}

/// Build feed routes
pub fn feed_routes() -> Router<AppState> {
    Router::new().route("/api/images/:user_id", get(get_feed))
}
