//! Error types for the sconee-archive library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CatalogError`] — **Fatal**: the run cannot proceed at all
//!   (invalid configuration, catalog file cannot be written). Returned as
//!   `Err(CatalogError)` from the top-level `run*` functions.
//!
//! * [`ItemError`] — **Non-fatal**: a single work item failed (page had no
//!   preview image, upload was not a decodable image, classifier returned
//!   garbage). Logged at the item boundary and the batch continues — one bad
//!   URL must never abort the whole run.
//!
//! The separation mirrors the pipeline's policy: every per-item failure kind
//! degrades to "skip this item, continue", while only environmental problems
//! surface to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the sconee-archive library.
///
/// Item-level failures use [`ItemError`] and are counted in
/// [`crate::run::RunStats`] rather than propagated here.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No API key was configured and the default classifier is in use.
    #[error("No classifier credentials configured.\nSet GEMINI_API_KEY or provide a classifier explicitly.")]
    MissingCredentials,

    /// The catalog file could not be written.
    #[error("Failed to write catalog '{path}': {source}")]
    CatalogWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The URL list file exists but could not be read or truncated.
    #[error("Failed to access URL list '{path}': {source}")]
    UrlListAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The intake directory exists but could not be enumerated.
    #[error("Failed to read intake directory '{path}': {source}")]
    IntakeUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single work item (one URL or one upload).
///
/// The orchestrator logs these and moves on; a skipped local file stays in
/// the intake directory for the next run, a skipped URL is dropped with the
/// rest of the batch.
#[derive(Debug, Error)]
pub enum ItemError {
    /// HTTP fetch of a page or image failed (network error or bad status).
    #[error("fetch failed for '{url}': {reason}")]
    Fetch { url: String, reason: String },

    /// HTTP fetch exceeded the configured timeout.
    #[error("fetch timed out after {secs}s for '{url}'")]
    Timeout { url: String, secs: u64 },

    /// The page was fetched but carries no `og:image` meta tag.
    #[error("no og:image tag found at '{url}'")]
    NoPreviewImage { url: String },

    /// The upload is unreadable or not a decodable raster image.
    #[error("cannot decode image '{path}': {reason}")]
    Decode { path: PathBuf, reason: String },

    /// The classification service call failed.
    #[error("classifier call failed for '{label}': {reason}")]
    Classifier { label: String, reason: String },

    /// The classifier answered, but the text did not parse as a record.
    #[error("classifier reply for '{label}' is not parseable")]
    Unparseable { label: String },

    /// Moving a consumed upload into the processed directory failed.
    #[error("failed to move '{from}' to '{to}': {source}")]
    Relocate {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other filesystem error while handling the item.
    #[error("io error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display() {
        let e = ItemError::Timeout {
            url: "https://example.org/room".into(),
            secs: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("10s"), "got: {msg}");
        assert!(msg.contains("example.org"));
    }

    #[test]
    fn no_preview_display() {
        let e = ItemError::NoPreviewImage {
            url: "https://blog.test/post".into(),
        };
        assert!(e.to_string().contains("og:image"));
    }

    #[test]
    fn catalog_write_display() {
        let e = CatalogError::CatalogWriteFailed {
            path: PathBuf::from("data.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.to_string().contains("data.json"));
    }
}
