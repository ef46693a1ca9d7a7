//! Pending-work discovery and consumption.
//!
//! Two intake sources with different consumption semantics:
//!
//! * the **URL list file** is consumed optimistically — after the batch has
//!   attempted every line the file is truncated, whatever happened to the
//!   individual URLs. A failed URL is gone unless someone re-adds it.
//! * the **upload folder** is consumed pessimistically — a file moves to
//!   the processed directory only when its whole pipeline succeeded, so a
//!   failure leaves it in place for the next run.
//!
//! The folder scan is a snapshot: files appearing mid-run wait for the next
//! one.

use crate::error::{CatalogError, ItemError};
use crate::pipeline::resolve::IMAGE_EXTENSIONS;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read pending URLs, one per line. Blank lines and `#` comments are
/// skipped. A missing file means no pending work, not an error.
pub fn read_url_list(path: &Path) -> Result<Vec<String>, CatalogError> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(CatalogError::UrlListAccess {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let urls: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();
    debug!("url list '{}': {} pending", path.display(), urls.len());
    Ok(urls)
}

/// Truncate the URL list after a batch. Missing file is fine.
pub fn truncate_url_list(path: &Path) -> Result<(), CatalogError> {
    if !path.exists() {
        return Ok(());
    }
    std::fs::write(path, "").map_err(|e| CatalogError::UrlListAccess {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Snapshot the intake directory's raster-image files, sorted by filename.
///
/// A missing directory means no pending uploads. Non-image files are left
/// alone and never reported.
pub fn scan_intake(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(CatalogError::IntakeUnreadable {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && has_image_extension(p))
        .collect();
    files.sort();
    debug!("intake '{}': {} pending uploads", dir.display(), files.len());
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Move a fully-processed upload into the processed directory.
///
/// Falls back to copy-then-remove when rename fails (the processed
/// directory may live on another filesystem).
pub fn relocate_processed(src: &Path, processed_dir: &Path) -> Result<PathBuf, ItemError> {
    let file_name = src.file_name().ok_or_else(|| ItemError::Io {
        path: src.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no filename"),
    })?;
    std::fs::create_dir_all(processed_dir).map_err(|e| ItemError::Io {
        path: processed_dir.to_path_buf(),
        source: e,
    })?;
    let dest = processed_dir.join(file_name);

    if std::fs::rename(src, &dest).is_err() {
        std::fs::copy(src, &dest)
            .and_then(|_| std::fs::remove_file(src))
            .map_err(|e| ItemError::Relocate {
                from: src.to_path_buf(),
                to: dest.clone(),
                source: e,
            })?;
    }
    debug!("relocated '{}' -> '{}'", src.display(), dest.display());
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_url_list_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(read_url_list(&dir.path().join("urls.txt")).unwrap().is_empty());
    }

    #[test]
    fn url_list_skips_blanks_and_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(
            &path,
            "https://a.test/one\n\n# queued last week\n  https://b.test/two  \n",
        )
        .unwrap();
        assert_eq!(
            read_url_list(&path).unwrap(),
            vec!["https://a.test/one", "https://b.test/two"]
        );
    }

    #[test]
    fn truncate_empties_the_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "https://a.test/one\n").unwrap();
        truncate_url_list(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        // missing file is not an error
        truncate_url_list(&dir.path().join("absent.txt")).unwrap();
    }

    #[test]
    fn scan_reports_only_image_files_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["b.jpg", "a.PNG", "notes.txt", "c.webp", "d.tiff"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.jpg")).unwrap();

        let names: Vec<String> = scan_intake(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.jpg", "c.webp"]);
    }

    #[test]
    fn missing_intake_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(scan_intake(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn relocate_moves_the_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("chair.jpg");
        std::fs::write(&src, b"bytes").unwrap();
        let processed = dir.path().join("processed");

        let dest = relocate_processed(&src, &processed).unwrap();
        assert!(!src.exists());
        assert_eq!(std::fs::read(dest).unwrap(), b"bytes");
    }
}
