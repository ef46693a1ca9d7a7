//! Upload normalization: decode, bound, and re-encode intake images.
//!
//! Whatever lands in the upload folder — phone photos, PNG screenshots,
//! WebP saves — the website serves one predictable artifact: a 3-channel
//! JPEG whose longest side is capped. The cap keeps page weight bounded;
//! quality 85 is visually transparent for photographic interiors. The
//! original upload is left untouched here so a downstream failure leaves
//! the item retryable.
//!
//! The normalized copy keeps the upload's filename (even a `.png` one);
//! catalog records reference it as `images/<file>` and the site serves the
//! bytes by path, not extension.

use crate::error::ItemError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decode `src`, bound it to `max_dimension`, and write the JPEG re-encode
/// into `dest_dir` under the same filename.
///
/// Returns the written path and the encoded bytes (the same bytes are sent
/// to the classifier, sparing a second read). Fails with
/// [`ItemError::Decode`] on unreadable or non-image input and
/// [`ItemError::Io`] on write problems; the caller skips the upload and
/// leaves it in place for the next run.
pub fn normalize_into(
    src: &Path,
    dest_dir: &Path,
    max_dimension: u32,
    jpeg_quality: u8,
) -> Result<(PathBuf, Vec<u8>), ItemError> {
    let file_name = src
        .file_name()
        .ok_or_else(|| ItemError::Decode {
            path: src.to_path_buf(),
            reason: "path has no filename".to_string(),
        })?
        .to_owned();

    let decoded = image::open(src).map_err(|e| ItemError::Decode {
        path: src.to_path_buf(),
        reason: e.to_string(),
    })?;

    // Force 3-channel colour; alpha and palette inputs become plain RGB.
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

    let (w, h) = (rgb.width(), rgb.height());
    let bounded = if w > max_dimension || h > max_dimension {
        // `resize` fits within the box preserving aspect ratio.
        let resized = rgb.resize(max_dimension, max_dimension, FilterType::Lanczos3);
        debug!(
            "downscaled '{}' {}x{} -> {}x{}",
            src.display(),
            w,
            h,
            resized.width(),
            resized.height()
        );
        resized
    } else {
        rgb
    };

    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), jpeg_quality);
    bounded
        .write_with_encoder(encoder)
        .map_err(|e| ItemError::Decode {
            path: src.to_path_buf(),
            reason: format!("jpeg encode: {e}"),
        })?;

    std::fs::create_dir_all(dest_dir).map_err(|e| ItemError::Io {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;
    let dest = dest_dir.join(file_name);
    std::fs::write(&dest, &bytes).map_err(|e| ItemError::Io {
        path: dest.clone(),
        source: e,
    })?;

    debug!("normalized '{}' -> '{}' ({} bytes)", src.display(), dest.display(), bytes.len());
    Ok((dest, bytes))
}
