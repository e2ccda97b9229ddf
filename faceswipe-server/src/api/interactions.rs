//! Like/dislike recording endpoint

use axum::{extract::State, routing::post, Json, Router};
use chrono::{SecondsFormat, Utc};
use faceswipe_common::ids;
use faceswipe_common::models::{Interaction, InteractionAction};
use serde::{Deserialize, Serialize};

use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub image_id: String,
    /// Validated by hand so an unknown action is a 400, not a body rejection
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct InteractResponse {
    pub message: String,
    pub interaction: Interaction,
}

/// POST /api/interact
pub async fn interact(
    State(state): State<AppState>,
    Json(payload): Json<InteractRequest>,
) -> ApiResult<Json<InteractResponse>> {
    if payload.user_id.is_empty() || payload.image_id.is_empty() || payload.action.is_empty() {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    }

    let action = match payload.action.as_str() {
        "like" => InteractionAction::Like,
        "dislike" => InteractionAction::Dislike,
        _ => return Err(ApiError::BadRequest("Invalid action".to_string())),
    };

    let user_id = payload.user_id;
    let image_id = payload.image_id;

    // Read-only existence check first, so the common conflict path does not
    // rewrite the backing file
    let exists = state
        .store
        .interactions
        .read()
        .await
        .iter()
        .any(|i| i.user_id == user_id && i.image_id == image_id);
    if exists {
        return Err(ApiError::Conflict(
            "Already interacted with this image".to_string(),
        ));
    }

    // At most one interaction per (user, image): re-check and append under
    // the collection lock in case a concurrent request won the race.
    let interaction = state
        .store
        .interactions
        .update(|interactions| {
            let exists = interactions
                .iter()
                .any(|i| i.user_id == user_id && i.image_id == image_id);
            if exists {
                return Err(ApiError::Conflict(
                    "Already interacted with this image".to_string(),
                ));
            }
            let interaction = Interaction {
                id: ids::new_id(),
                user_id: user_id.clone(),
                image_id: image_id.clone(),
                action,
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            };
            interactions.push(interaction.clone());
            Ok(interaction)
        })
        .await??;

    Ok(Json(InteractResponse {
        message: format!("Image {}d", payload.action),
        interaction,
    }))
}

/// Build interaction routes
pub fn interaction_routes() -> Router<AppState> {
    Router::new().route("/api/interact", post(interact))
}
