//! Domain models persisted in the flat-file collections
//!
//! Field names are serialized in camelCase to match the on-disk JSON schema
//! the frontend consumes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uploader id recorded on images produced by the background generator
pub const SYSTEM_UPLOADER: &str = "system";

/// A registered user. Created on first login, never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque id (timestamp + suffix)
    pub id: String,
    /// Unique, case-sensitive
    pub username: String,
}

/// A stored image, either user-uploaded or fetched by the AI generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    /// Name of the file under the uploads directory
    pub filename: String,
    pub original_name: String,
    /// Public path ("/uploads/<filename>")
    pub path: String,
    /// User id, or [`SYSTEM_UPLOADER`] for generated images
    pub uploader_id: String,
    /// RFC 3339 UTC
    pub upload_timestamp: String,
    #[serde(rename = "isAI")]
    pub is_ai: bool,
    /// 0..1; absent on disk means "unknown" and is defaulted in the feed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likeness_probability: Option<f64>,
    /// Opaque analyzer output, or the error-shaped fallback. Records written
    /// before extraction ran may lack the key; it reads as null and is
    /// repaired by the maintenance back-fill.
    #[serde(default)]
    pub features: Value,
}

/// Swipe direction recorded for an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionAction {
    Like,
    Dislike,
}

/// One user's like/dislike on one image. At most one per (user, image) pair;
/// immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: String,
    pub user_id: String,
    pub image_id: String,
    pub action: InteractionAction,
    /// RFC 3339 UTC
    pub timestamp: String,
}
