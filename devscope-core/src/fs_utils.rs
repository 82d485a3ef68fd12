//! Saving downloads to disk
//!
//! Report PDFs and device files arrive as whole byte buffers. These helpers
//! pick a non-clobbering path in the target directory, create missing
//! directories, and remove the file again if the write fails halfway.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::{DeviceError, Result};

/// Make a server-supplied file name safe to join onto a directory
///
/// Path separators and leading dots are dropped so the name cannot escape the
/// target directory. Returns `None` when nothing usable is left.
///
/// # Example
///
/// ```rust
/// use devscope_core::fs_utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
/// assert_eq!(sanitize_filename("calls_report.pdf").as_deref(), Some("calls_report.pdf"));
/// assert!(sanitize_filename("..").is_none());
/// ```
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim()
        .trim_start_matches('.');
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Ensure parent directory exists, creating it if necessary
pub async fn ensure_parent_dir(file_path: impl AsRef<Path>) -> Result<()> {
    let file_path = file_path.as_ref();

    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directory: {}", parent.display());
            fs::create_dir_all(parent).await?;
        }
    }

    Ok(())
}

/// A path in `base_dir` that does not collide with an existing file
///
/// `report.pdf` becomes `report (1).pdf`, `report (2).pdf`, ... as needed.
pub fn unique_download_path(base_dir: impl AsRef<Path>, filename: &str) -> PathBuf {
    let base_dir = base_dir.as_ref();
    let path = base_dir.join(filename);
    if !path.exists() {
        return path;
    }

    let (stem, ext) = match filename.rfind('.') {
        Some(dot) if dot > 0 => filename.split_at(dot),
        _ => (filename, ""),
    };

    for i in 1..1000 {
        let candidate = base_dir.join(format!("{} ({}){}", stem, i, ext));
        if !candidate.exists() {
            return candidate;
        }
    }

    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    base_dir.join(format!("{}_{}{}", stem, stamp, ext))
}

/// Delete a partially written file; failures are only logged
pub async fn cleanup_partial_file(path: impl AsRef<Path>) {
    let path = path.as_ref();

    if path.exists() {
        if let Err(e) = fs::remove_file(path).await {
            warn!("Failed to clean up partial file {}: {}", path.display(), e);
        } else {
            debug!("Cleaned up partial file: {}", path.display());
        }
    }
}

/// Write `data` to a fresh file named after `filename` inside `dir`
///
/// Returns the path actually written.
pub async fn save_download(dir: impl AsRef<Path>, filename: &str, data: &[u8]) -> Result<PathBuf> {
    let safe_name = sanitize_filename(filename).ok_or_else(|| {
        DeviceError::InvalidResponse(format!("unusable file name {:?}", filename))
    })?;

    let path = unique_download_path(dir.as_ref(), &safe_name);
    ensure_parent_dir(&path).await?;

    let mut file = fs::File::create(&path).await?;
    let written = async {
        file.write_all(data).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        cleanup_partial_file(&path).await;
        return Err(e.into());
    }

    info!("Saved {} bytes to {}", data.len(), path.display());
    Ok(path)
}
