//! Feature-extraction adapter
//!
//! Executes the external analyzer script against one image and parses the
//! single JSON object it prints on stdout. The analyzer is an opaque
//! collaborator; everything that can go wrong on its side (missing script,
//! missing image, non-zero exit, timeout, empty or unparsable output, the
//! analyzer's optional dlib dependency being absent) is normalized into
//! [`ExtractError`], and [`FeatureExtractor::extract_or_fallback`] degrades
//! any error into the canonical fallback feature shape so callers always get
//! a value.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Normalized adapter-level failure
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Feature extractor script not found: {0}")]
    ScriptMissing(PathBuf),

    #[error("Image file not found: {0}")]
    ImageMissing(PathBuf),

    #[error("Failed to start feature extraction process: {0}")]
    Spawn(String),

    #[error("Feature extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("Feature extraction failed with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Feature extraction returned no output")]
    EmptyOutput,

    #[error("Failed to parse feature extraction results: {0}")]
    Parse(String),

    #[error("Analyzer dependency unavailable: {0}")]
    Unavailable(String),
}

/// Canonical error-shaped feature value used when extraction fails
pub fn fallback_features(error: &str) -> Value {
    json!({
        "error": error,
        "has_face": false,
        "avg_color": { "r": 0, "g": 0, "b": 0 },
    })
}

/// Returns true if a stored feature value needs (re-)extraction: absent,
/// null, error-shaped, or a test fixture.
pub fn needs_extraction(features: &Value) -> bool {
    match features {
        Value::Null => true,
        Value::Object(map) => map.contains_key("error") || map.get("test") == Some(&Value::Bool(true)),
        _ => true,
    }
}

/// Pluggable feature-extraction capability
///
/// The concrete analyzer (subprocess, in-process library, remote service) is
/// swappable without touching callers.
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    /// Extract features from one image
    async fn extract(&self, image: &Path) -> Result<Value, ExtractError>;

    /// Extract features, degrading any failure to the fallback shape.
    ///
    /// Never fails past this boundary.
    async fn extract_or_fallback(&self, image: &Path) -> Value {
        match self.extract(image).await {
            Ok(features) => features,
            Err(e) => {
                warn!("Feature extraction failed for {}: {}", image.display(), e);
                fallback_features(&e.to_string())
            }
        }
    }
}

/// Feature extractor that shells out to the external analyzer script
pub struct ScriptExtractor {
    script: PathBuf,
    interpreter: String,
    timeout: Duration,
}

impl ScriptExtractor {
    pub fn new(script: PathBuf, interpreter: String, timeout: Duration) -> Self {
        Self {
            script,
            interpreter,
            timeout,
        }
    }
}

#[async_trait]
impl FeatureExtractor for ScriptExtractor {
    async fn extract(&self, image: &Path) -> Result<Value, ExtractError> {
        if !self.script.exists() {
            return Err(ExtractError::ScriptMissing(self.script.clone()));
        }
        if !image.exists() {
            return Err(ExtractError::ImageMissing(image.to_path_buf()));
        }

        // Analyzer contract: one positional argument, the absolute image path
        let image_path = image
            .canonicalize()
            .unwrap_or_else(|_| image.to_path_buf());

        debug!(
            script = %self.script.display(),
            image = %image_path.display(),
            "Running feature extractor"
        );

        let child = Command::new(&self.interpreter)
            .arg(&self.script)
            .arg(&image_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractError::Spawn(e.to_string()))?;

        // kill_on_drop terminates the analyzer when the timeout fires
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExtractError::Timeout(self.timeout))?
            .map_err(|e| ExtractError::Spawn(e.to_string()))?;

        if !output.status.success() {
            return Err(ExtractError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Err(ExtractError::EmptyOutput);
        }

        let features: Value =
            serde_json::from_str(stdout.trim()).map_err(|e| ExtractError::Parse(e.to_string()))?;

        // The analyzer reports its own optional-dependency failures in-band
        if let Some(error) = features.get("error").and_then(Value::as_str) {
            if error.contains("dlib") {
                return Err(ExtractError::Unavailable(error.to_string()));
            }
        }

        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn shell_extractor(dir: &TempDir, script_body: &str, timeout_secs: u64) -> ScriptExtractor {
        let script = dir.path().join("analyzer.sh");
        let mut file = std::fs::File::create(&script).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "{}", script_body).unwrap();
        ScriptExtractor::new(script, "sh".to_string(), Duration::from_secs(timeout_secs))
    }

    fn touch_image(dir: &TempDir) -> PathBuf {
        let image = dir.path().join("face.jpg");
        std::fs::write(&image, b"not really a jpeg").unwrap();
        image
    }

    #[test]
    fn test_fallback_shape() {
        let value = fallback_features("boom");
        assert_eq!(value["error"], "boom");
        assert_eq!(value["has_face"], false);
        assert_eq!(value["avg_color"]["r"], 0);
    }

    #[test]
    fn test_needs_extraction() {
        assert!(needs_extraction(&Value::Null));
        assert!(needs_extraction(&json!({"error": "nope"})));
        assert!(needs_extraction(&json!({"test": true})));
        assert!(needs_extraction(&json!("bogus")));
        assert!(!needs_extraction(&json!({"has_face": true})));
    }

    #[tokio::test]
    async fn test_missing_script() {
        let dir = TempDir::new().unwrap();
        let extractor = ScriptExtractor::new(
            dir.path().join("gone.py"),
            "sh".to_string(),
            Duration::from_secs(5),
        );
        let image = touch_image(&dir);

        let result = extractor.extract(&image).await;
        assert!(matches!(result, Err(ExtractError::ScriptMissing(_))));
    }

    #[tokio::test]
    async fn test_missing_image_never_panics() {
        let dir = TempDir::new().unwrap();
        let extractor = shell_extractor(&dir, "echo '{}'", 5);

        let result = extractor.extract(Path::new("/nonexistent/face.jpg")).await;
        assert!(matches!(result, Err(ExtractError::ImageMissing(_))));

        // extract_or_fallback degrades to the error shape
        let value = extractor
            .extract_or_fallback(Path::new("/nonexistent/face.jpg"))
            .await;
        assert_eq!(value["has_face"], false);
        assert!(value["error"].is_string());
    }

    #[tokio::test]
    async fn test_successful_extraction() {
        let dir = TempDir::new().unwrap();
        let extractor = shell_extractor(&dir, "echo '{\"has_face\": true, \"face_count\": 1}'", 5);
        let image = touch_image(&dir);

        let features = extractor.extract(&image).await.unwrap();
        assert_eq!(features["has_face"], true);
        assert_eq!(features["face_count"], 1);
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let dir = TempDir::new().unwrap();
        let extractor = shell_extractor(&dir, "exit 3", 5);
        let image = touch_image(&dir);

        let result = extractor.extract(&image).await;
        assert!(matches!(result, Err(ExtractError::Failed { code: Some(3), .. })));
    }

    #[tokio::test]
    async fn test_empty_output() {
        let dir = TempDir::new().unwrap();
        let extractor = shell_extractor(&dir, "true", 5);
        let image = touch_image(&dir);

        let result = extractor.extract(&image).await;
        assert!(matches!(result, Err(ExtractError::EmptyOutput)));
    }

    #[tokio::test]
    async fn test_unparsable_output() {
        let dir = TempDir::new().unwrap();
        let extractor = shell_extractor(&dir, "echo 'not json at all'", 5);
        let image = touch_image(&dir);

        let result = extractor.extract(&image).await;
        assert!(matches!(result, Err(ExtractError::Parse(_))));
    }

    #[tokio::test]
    async fn test_in_band_dlib_error() {
        let dir = TempDir::new().unwrap();
        let extractor =
            shell_extractor(&dir, "echo '{\"error\": \"dlib shape predictor model not found\"}'", 5);
        let image = touch_image(&dir);

        let result = extractor.extract(&image).await;
        assert!(matches!(result, Err(ExtractError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let dir = TempDir::new().unwrap();
        let extractor = shell_extractor(&dir, "sleep 30", 1);
        let image = touch_image(&dir);

        let result = extractor.extract(&image).await;
        assert!(matches!(result, Err(ExtractError::Timeout(_))));
    }
}
