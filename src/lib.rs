//! # sconee-archive
//!
//! Catalog updater for an interior-design image archive. The website itself
//! is a static page driven by one JSON file; this crate is the tool that
//! grows that file: it takes images from two intake sources, has a vision
//! LLM tag them (space type, style, material/colour), and prepends the
//! results to the catalog, newest first.
//!
//! ## Pipeline Overview
//!
//! ```text
//! urls.txt    one URL per line, consumed per batch
//!  │
//!  ├─ 1. Resolve    direct image link, or the page's og:image
//!  ├─ 2. Download   image bytes for the classifier
//! uploads/    local intake folder, moved on success
//!  │
//!  ├─ 1. Normalize  decode → RGB → ≤1600 px → JPEG q85 → images/
//!  │
//!  ├─ 3. Classify   Gemini generateContent, fences stripped, JSON parsed
//!  ├─ 4. Catalog    prepend record, rewrite data.json
//!  └─ 5. Publish    best-effort git add/commit/push
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sconee_archive::{run, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials auto-detected from GEMINI_API_KEY
//!     let config = PipelineConfig::builder().publish(true).build()?;
//!     let stats = run(&config).await?;
//!     println!(
//!         "{} urls, {} uploads catalogued",
//!         stats.urls_succeeded, stats.uploads_succeeded
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Failure policy
//!
//! Per-item failures (unreachable page, missing `og:image`, undecodable
//! upload, unparseable classifier reply) skip the item and continue the
//! batch. Skipped uploads stay in the intake folder for the next run;
//! skipped URLs are dropped when the list is truncated. Publish failures
//! never affect the already-persisted catalog.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `catalog-update` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod publish;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{Catalog, CatalogRecord};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{CatalogError, ItemError};
pub use pipeline::classify::{
    parse_classification, Classification, GeminiClassifier, ImagePayload, VisionClassifier,
};
pub use run::{run, run_single_url, RunStats};
