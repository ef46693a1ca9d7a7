//! The catalog store: one ordered JSON array of classified-image records.
//!
//! ## Why whole-file rewrites?
//!
//! The catalog is small (hundreds to low thousands of records) and has
//! exactly one writer per run, so a full read-modify-write per item is both
//! simple and crash-safe enough: a crash mid-run loses only the unflushed
//! tail, never corrupts records already on disk. The file is written pretty-
//! printed with non-ASCII preserved literally, because it is hand-inspected
//! and diffed in the website repository.
//!
//! A missing or malformed file loads as an empty catalog rather than an
//! error. That is a deliberate, lossy policy: the updater must keep working
//! after a bad hand edit, and the git history of the site repo is the
//! backstop for recovering a clobbered catalog.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One entry of the website catalog.
///
/// Two historical shapes coexist in `data.json`: early records carry a single
/// combined `tags` string (`"Home | Wood | Beige | Sweden"`), later ones the
/// split `space`/`vibe`/`detail` fields. All classification fields are
/// optional so both shapes round-trip untouched; `None` fields are omitted
/// on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Short creative title, e.g. "Cozy Nordic Living Room".
    #[serde(default)]
    pub title: String,

    /// Space-type category (Home, Hotel, Cafe, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,

    /// Style / atmosphere descriptor (Minimalist, Industrial, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibe: Option<String>,

    /// Key material or colour detail (Wood & White, Dark Grey, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Combined pipe-delimited tag string (legacy record shape).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    /// Absolute URL or `images/<file>` path the website resolves.
    #[serde(default)]
    pub img: String,
}

/// The in-memory catalog, most-recent-first, bound to its backing file.
#[derive(Debug)]
pub struct Catalog {
    path: PathBuf,
    records: Vec<CatalogRecord>,
}

impl Catalog {
    /// Load the catalog from `path`.
    ///
    /// A missing file or unparseable content yields an empty catalog — this
    /// never fails. The bad content is logged and will be overwritten by the
    /// next save.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Vec<CatalogRecord>>(&text) {
                Ok(records) => records,
                Err(e) => {
                    warn!(
                        "catalog '{}' is malformed ({}); starting empty",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("catalog '{}' does not exist yet", path.display());
                Vec::new()
            }
            Err(e) => {
                warn!("cannot read catalog '{}' ({}); starting empty", path.display(), e);
                Vec::new()
            }
        };
        debug!("loaded {} catalog records from '{}'", records.len(), path.display());
        Self { path, records }
    }

    /// Insert `record` at the head (most-recent-first) and rewrite the file.
    ///
    /// The full array is serialized pretty-printed on every call; per-record
    /// appends are not worth the format complexity at this catalog size.
    pub fn prepend_and_save(&mut self, record: CatalogRecord) -> Result<(), CatalogError> {
        self.records.insert(0, record);
        self.save()
    }

    fn save(&self) -> Result<(), CatalogError> {
        let json = serde_json::to_string_pretty(&self.records)
            .map_err(|e| CatalogError::Internal(format!("catalog serialization: {e}")))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CatalogError::CatalogWriteFailed {
                    path: self.path.clone(),
                    source: e,
                })?;
            }
        }
        std::fs::write(&self.path, json).map_err(|e| CatalogError::CatalogWriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The records, newest first.
    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
