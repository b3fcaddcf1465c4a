//! Download delivery: filename generation and saving decoded data URIs.

use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::PngImage;
use crate::error::AppError;
use crate::types::TradingDate;

/// Lowercases and collapses anything outside `[a-z0-9]` into single dashes.
pub fn slugify(segment: &str) -> String {
    let mut slug = String::with_capacity(segment.len());
    for c in segment.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "card".to_string()
    } else {
        slug
    }
}

/// `<product>-<card-type>-<ISO date>.png`
pub fn export_filename(product: &str, category: &str, date: TradingDate) -> String {
    format!("{}-{}-{}.png", slugify(product), slugify(category), date.iso())
}

/// Picks a path in `dir` that does not exist yet, suffixing `-1`, `-2`, ...
/// before the extension when `filename` is taken.
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("card");
    let ext = Path::new(filename)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("png");

    for i in 1..1000 {
        let candidate = dir.join(format!("{}-{}.{}", stem, i, ext));
        if !candidate.exists() {
            return candidate;
        }
    }

    let timestamp = chrono::Local::now().format("%H%M%S%3f");
    dir.join(format!("{}-{}.{}", stem, timestamp, ext))
}

/// Decodes a PNG data URI and writes it under `dir`, never overwriting.
pub fn save_data_uri(dir: &Path, filename: &str, uri: &str) -> Result<PathBuf, AppError> {
    let png = PngImage::from_data_uri(uri)?;

    fs::create_dir_all(dir)?;
    let path = unique_path(dir, filename);
    log::debug!("Writing {} bytes to {}", png.bytes.len(), path.display());
    fs::write(&path, &png.bytes)?;

    log::info!("Saved card image: {}", path.display());
    Ok(path)
}
