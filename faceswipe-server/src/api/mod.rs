//! HTTP API handlers for faceswipe-server

pub mod auth;
pub mod feed;
pub mod health;
pub mod images;
pub mod interactions;
pub mod stats;

pub use auth::auth_routes;
pub use feed::feed_routes;
pub use health::health_routes;
pub use images::image_routes;
pub use interactions::interaction_routes;
pub use stats::stats_routes;
