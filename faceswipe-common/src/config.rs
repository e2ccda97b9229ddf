//! Configuration loading
//!
//! Resolution priority per key: environment variable, then TOML config file,
//! then compiled default. The TOML file path itself comes from
//! `FACESWIPE_CONFIG` (default `./faceswipe.toml`); a missing file is not an
//! error, a malformed one is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listen port
    pub port: u16,
    /// Directory holding the JSON collection files
    pub data_dir: PathBuf,
    /// Directory holding uploaded and generated images
    pub uploads_dir: PathBuf,
    /// Path to the external feature-extraction script
    pub extractor_script: PathBuf,
    /// Interpreter used to run the extractor script
    pub python_bin: String,
    /// External source for generated face images
    pub image_source_url: String,
    /// Seconds between background generation ticks
    pub generation_interval_secs: u64,
    /// Seconds before the first generation run after startup
    pub generation_startup_delay_secs: u64,
    /// Wall-clock bound on one extractor invocation
    pub extractor_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            data_dir: PathBuf::from("./data"),
            uploads_dir: PathBuf::from("./uploads"),
            extractor_script: PathBuf::from("./ml/feature_extractor.py"),
            python_bin: "python".to_string(),
            image_source_url: "https://thispersondoesnotexist.com".to_string(),
            generation_interval_secs: 30,
            generation_startup_delay_secs: 3,
            extractor_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from the TOML file (if present) and apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FACESWIPE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("faceswipe.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| Error::Config(format!("Read {} failed: {}", config_path.display(), e)))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Parse {} failed: {}", config_path.display(), e)))?;
            info!("Configuration loaded from {}", config_path.display());
            config
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("FACESWIPE_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!("Ignoring invalid FACESWIPE_PORT: {}", port),
            }
        }
        if let Ok(dir) = std::env::var("FACESWIPE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("FACESWIPE_UPLOADS_DIR") {
            self.uploads_dir = PathBuf::from(dir);
        }
        if let Ok(script) = std::env::var("FACESWIPE_EXTRACTOR_SCRIPT") {
            self.extractor_script = PathBuf::from(script);
        }
        if let Ok(bin) = std::env::var("FACESWIPE_PYTHON_BIN") {
            self.python_bin = bin;
        }
        if let Ok(url) = std::env::var("FACESWIPE_IMAGE_SOURCE_URL") {
            self.image_source_url = url;
        }
    }
}
