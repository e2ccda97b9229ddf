//! # Faceswipe Common Library
//!
//! Shared code for the faceswipe backend:
//! - Domain models (users, images, interactions)
//! - Flat-file JSON store
//! - Configuration loading
//! - Error types

pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod store;

pub use error::{Error, Result};
