//! The pipeline orchestrator: one sequential pass over both intake sources.
//!
//! Ordering per run: pending URLs first (resolve → download → classify →
//! prepend), then the upload folder (normalize → classify → prepend →
//! relocate), then an optional git publish when anything succeeded.
//!
//! Everything is deliberately sequential — one item at a time, each network
//! call blocking the run until it completes or times out. The batch is tens
//! of items and the external service is rate-limited by courtesy anyway, so
//! concurrency would buy nothing and cost the fixed inter-item delay its
//! meaning. Per-item failures are logged and skipped; only configuration
//! and catalog-write problems abort the run.

use crate::catalog::{Catalog, CatalogRecord};
use crate::config::PipelineConfig;
use crate::error::{CatalogError, ItemError};
use crate::pipeline::classify::{
    parse_classification, Classification, GeminiClassifier, ImagePayload, VisionClassifier,
};
use crate::pipeline::{intake, normalize, resolve};
use crate::publish;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub urls_attempted: usize,
    pub urls_succeeded: usize,
    pub uploads_attempted: usize,
    pub uploads_succeeded: usize,
    /// Whether the post-run git publish went through.
    pub published: bool,
}

impl RunStats {
    pub fn total_succeeded(&self) -> usize {
        self.urls_succeeded + self.uploads_succeeded
    }
}

/// Run the full pipeline over both intake sources.
pub async fn run(config: &PipelineConfig) -> Result<RunStats, CatalogError> {
    let classifier = resolve_classifier(config)?;
    let client = resolve::browser_client(config.http_timeout_secs)?;
    let mut catalog = Catalog::load(&config.catalog_path);
    let mut stats = RunStats::default();

    // ── Phase 1: pending URLs ────────────────────────────────────────────
    let urls = intake::read_url_list(&config.url_list_path)?;
    for url in &urls {
        stats.urls_attempted += 1;
        match process_url(&client, &classifier, config, url).await {
            Ok(record) => {
                info!("catalogued '{}' from {}", record.title, url);
                catalog.prepend_and_save(record)?;
                stats.urls_succeeded += 1;
                courtesy_pause(config).await;
            }
            Err(e) => warn!("skipping url {}: {}", url, e),
        }
    }
    // Consumed optimistically: failures are dropped with the batch. The
    // truncate clears blank-and-comment-only lists too; a missing file is
    // left missing.
    intake::truncate_url_list(&config.url_list_path)?;

    // ── Phase 2: upload folder ───────────────────────────────────────────
    let uploads = intake::scan_intake(&config.intake_dir)?;
    for upload in &uploads {
        stats.uploads_attempted += 1;
        match process_upload(&classifier, config, upload).await {
            Ok(record) => {
                info!("catalogued '{}' from {}", record.title, upload.display());
                catalog.prepend_and_save(record)?;
                stats.uploads_succeeded += 1;
                if let Err(e) = intake::relocate_processed(upload, &config.processed_dir) {
                    // The record is already persisted; leaving the upload in
                    // place only risks a duplicate on the next run.
                    warn!("{}", e);
                }
                courtesy_pause(config).await;
            }
            Err(e) => warn!("skipping upload {}: {}", upload.display(), e),
        }
    }

    // ── Phase 3: publish ─────────────────────────────────────────────────
    if stats.total_succeeded() == 0 {
        info!("no new items catalogued this run");
    } else if config.publish {
        stats.published = publish::publish(&config.repo_dir).await;
    }

    Ok(stats)
}

/// Process one URL end to end and prepend the result — the interactive
/// single-URL mode. Returns `None` when the item was skipped.
pub async fn run_single_url(
    config: &PipelineConfig,
    url: &str,
) -> Result<Option<CatalogRecord>, CatalogError> {
    let classifier = resolve_classifier(config)?;
    let client = resolve::browser_client(config.http_timeout_secs)?;
    let mut catalog = Catalog::load(&config.catalog_path);

    match process_url(&client, &classifier, config, url).await {
        Ok(record) => {
            catalog.prepend_and_save(record.clone())?;
            Ok(Some(record))
        }
        Err(e) => {
            warn!("skipping url {}: {}", url, e);
            Ok(None)
        }
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn resolve_classifier(
    config: &PipelineConfig,
) -> Result<Arc<dyn VisionClassifier>, CatalogError> {
    if let Some(ref classifier) = config.classifier {
        return Ok(Arc::clone(classifier));
    }
    let api_key = config
        .resolve_api_key()
        .ok_or(CatalogError::MissingCredentials)?;
    let gemini = GeminiClassifier::new(api_key, &config.model, config.http_timeout_secs)?;
    Ok(Arc::new(gemini))
}

async fn process_url(
    client: &reqwest::Client,
    classifier: &Arc<dyn VisionClassifier>,
    config: &PipelineConfig,
    url: &str,
) -> Result<CatalogRecord, ItemError> {
    let image_url = resolve::resolve_image_url(client, url, config.http_timeout_secs).await?;
    let bytes = resolve::download_image(client, &image_url, config.http_timeout_secs).await?;
    let payload = ImagePayload::from_bytes_named(bytes, &image_url);

    let classification = classify(classifier, &payload, url).await?;
    Ok(classification.into_record(image_url))
}

async fn process_upload(
    classifier: &Arc<dyn VisionClassifier>,
    config: &PipelineConfig,
    upload: &Path,
) -> Result<CatalogRecord, ItemError> {
    let (dest, bytes) = normalize::normalize_into(
        upload,
        &config.images_dir,
        config.max_dimension,
        config.jpeg_quality,
    )?;
    let payload = ImagePayload::jpeg(bytes);
    let label = upload.display().to_string();

    let classification = classify(classifier, &payload, &label).await?;
    Ok(classification.into_record(site_image_path(&config.images_dir, &dest)))
}

async fn classify(
    classifier: &Arc<dyn VisionClassifier>,
    payload: &ImagePayload,
    label: &str,
) -> Result<Classification, ItemError> {
    let raw = classifier.describe(payload, label).await?;
    parse_classification(&raw).ok_or_else(|| ItemError::Unparseable {
        label: label.to_string(),
    })
}

/// The site-relative reference stored in the catalog: the asset directory's
/// name joined with the filename, e.g. `images/chair.jpg`, independent of
/// where the directory actually lives on disk.
fn site_image_path(images_dir: &Path, file: &Path) -> String {
    let dir = images_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "images".to_string());
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{dir}/{name}")
}

async fn courtesy_pause(config: &PipelineConfig) {
    if config.courtesy_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(config.courtesy_delay_ms)).await;
    }
}
