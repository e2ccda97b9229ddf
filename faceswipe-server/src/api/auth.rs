//! Simulated login endpoint
//!
//! There is no authentication: logging in with a username finds or creates
//! the matching user. Idempotent per username.

use axum::{extract::State, routing::post, Json, Router};
use faceswipe_common::ids;
use faceswipe_common::models::User;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: User,
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }

    // Usernames are unique and case-sensitive; find-or-create runs under the
    // collection lock so concurrent logins cannot create duplicates.
    let user = state
        .store
        .users
        .update(|users| {
            if let Some(user) = users.iter().find(|u| u.username == username) {
                return user.clone();
            }
            let user = User {
                id: ids::new_id(),
                username: username.clone(),
            };
            info!("Created user {} ({})", user.username, user.id);
            users.push(user.clone());
            user
        })
        .await?;

    Ok(Json(LoginResponse {
        message: "Logged in".to_string(),
        user,
    }))
}

/// Build auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/api/login", post(login))
}
