//! Configuration for a catalog update run.
//!
//! Everything the pipeline needs — folder locations, service credentials,
//! timeouts, the courtesy delay — lives in one [`PipelineConfig`] passed to
//! the orchestrator at construction. Nothing is read from process-wide
//! mutable state, so two configs can coexist in tests and a run can be
//! reproduced from its logged config alone.
//!
//! Built via [`PipelineConfig::builder()`]; defaults match the layout of the
//! website repository (catalog at `data.json`, uploads in `uploads/`, served
//! assets in `images/`).

use crate::error::CatalogError;
use crate::pipeline::classify::VisionClassifier;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for the catalog update pipeline.
///
/// # Example
/// ```rust
/// use sconee_archive::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .api_key("test-key")
///     .intake_dir("uploads")
///     .courtesy_delay_ms(1500)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Path of the JSON catalog file driving the website. Default: `data.json`.
    pub catalog_path: PathBuf,

    /// Line-delimited file of pending URLs. Default: `urls.txt`.
    ///
    /// Truncated to empty after every batch, successful or not — a failed
    /// URL is dropped rather than retried.
    pub url_list_path: PathBuf,

    /// Directory of uploaded images awaiting processing. Default: `uploads`.
    pub intake_dir: PathBuf,

    /// Directory consumed uploads are moved into on success. Default: `processed`.
    pub processed_dir: PathBuf,

    /// Web-asset directory the site serves images from. Default: `images`.
    ///
    /// Normalized copies land here under the upload's original filename, and
    /// catalog records reference them as `images/<file>`.
    pub images_dir: PathBuf,

    /// Classification service API key. Falls back to `GEMINI_API_KEY` at
    /// build time when unset. Ignored when [`Self::classifier`] is provided.
    pub api_key: Option<String>,

    /// Classifier model identifier. Default: `gemini-1.5-flash`.
    pub model: String,

    /// Timeout for every HTTP call in seconds. Default: 10.
    pub http_timeout_secs: u64,

    /// Pause after each successful classification in milliseconds. Default: 2000.
    ///
    /// A courtesy rate limit toward the external service, not a correctness
    /// mechanism. Applies only after successes; failures continue immediately.
    pub courtesy_delay_ms: u64,

    /// Maximum width or height of a normalized upload in pixels. Default: 1600.
    ///
    /// Uploads larger in either dimension are downscaled preserving aspect
    /// ratio, keeping served assets bounded no matter what camera produced
    /// the original.
    pub max_dimension: u32,

    /// JPEG quality for re-encoded uploads, 1–100. Default: 85.
    pub jpeg_quality: u8,

    /// Whether a run with at least one success ends with a git publish. Default: false.
    pub publish: bool,

    /// Working tree the publisher stages and pushes. Default: `.`.
    pub repo_dir: PathBuf,

    /// Pre-constructed classifier. Takes precedence over `api_key`/`model`;
    /// lets tests substitute a mock without touching pipeline logic.
    pub classifier: Option<Arc<dyn VisionClassifier>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("data.json"),
            url_list_path: PathBuf::from("urls.txt"),
            intake_dir: PathBuf::from("uploads"),
            processed_dir: PathBuf::from("processed"),
            images_dir: PathBuf::from("images"),
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            http_timeout_secs: 10,
            courtesy_delay_ms: 2000,
            max_dimension: 1600,
            jpeg_quality: 85,
            publish: false,
            repo_dir: PathBuf::from("."),
            classifier: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("catalog_path", &self.catalog_path)
            .field("url_list_path", &self.url_list_path)
            .field("intake_dir", &self.intake_dir)
            .field("processed_dir", &self.processed_dir)
            .field("images_dir", &self.images_dir)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("courtesy_delay_ms", &self.courtesy_delay_ms)
            .field("max_dimension", &self.max_dimension)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("publish", &self.publish)
            .field("repo_dir", &self.repo_dir)
            .field(
                "classifier",
                &self.classifier.as_ref().map(|_| "<dyn VisionClassifier>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// The API key to use, preferring the explicit field over the environment.
    pub(crate) fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn catalog_path(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.catalog_path = p.into();
        self
    }

    pub fn url_list_path(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.url_list_path = p.into();
        self
    }

    pub fn intake_dir(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.intake_dir = p.into();
        self
    }

    pub fn processed_dir(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.processed_dir = p.into();
        self
    }

    pub fn images_dir(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.images_dir = p.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.config.http_timeout_secs = secs.max(1);
        self
    }

    pub fn courtesy_delay_ms(mut self, ms: u64) -> Self {
        self.config.courtesy_delay_ms = ms;
        self
    }

    pub fn max_dimension(mut self, px: u32) -> Self {
        self.config.max_dimension = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn publish(mut self, v: bool) -> Self {
        self.config.publish = v;
        self
    }

    pub fn repo_dir(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.repo_dir = p.into();
        self
    }

    pub fn classifier(mut self, c: Arc<dyn VisionClassifier>) -> Self {
        self.config.classifier = Some(c);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, CatalogError> {
        let c = &self.config;
        if c.model.is_empty() {
            return Err(CatalogError::InvalidConfig("model must not be empty".into()));
        }
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(CatalogError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.max_dimension < 100 {
            return Err(CatalogError::InvalidConfig(format!(
                "max dimension must be ≥ 100 px, got {}",
                c.max_dimension
            )));
        }
        if c.intake_dir == c.processed_dir {
            return Err(CatalogError::InvalidConfig(
                "intake and processed directories must differ".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let c = PipelineConfig::builder().build().unwrap();
        assert_eq!(c.max_dimension, 1600);
        assert_eq!(c.jpeg_quality, 85);
        assert_eq!(c.http_timeout_secs, 10);
        assert_eq!(c.catalog_path, PathBuf::from("data.json"));
    }

    #[test]
    fn setters_clamp() {
        let c = PipelineConfig::builder()
            .jpeg_quality(250)
            .max_dimension(10)
            .http_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(c.jpeg_quality, 100);
        assert_eq!(c.max_dimension, 100);
        assert_eq!(c.http_timeout_secs, 1);
    }

    #[test]
    fn same_intake_and_processed_rejected() {
        let err = PipelineConfig::builder()
            .intake_dir("x")
            .processed_dir("x")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn debug_redacts_key() {
        let c = PipelineConfig::builder().api_key("secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("redacted"));
    }
}
