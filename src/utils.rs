//! Utility functions for tokens and file operations

use crate::error::{Error, Result};
use rand::Rng;
use std::path::Path;

/// Generate a random alphanumeric token of the given length
///
/// Used for request identifiers and scratch directory names.
pub fn token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Move a file, falling back to copy-then-remove across filesystem boundaries
///
/// The scratch download directory and the public directory may live on
/// different mounts, where a plain rename fails with `EXDEV`.
pub async fn move_file(from: &Path, to: &Path) -> Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(_) => {
            tokio::fs::copy(from, to).await.map_err(|e| {
                Error::MoveFile(format!(
                    "failed to copy {} to {}: {}",
                    from.display(),
                    to.display(),
                    e
                ))
            })?;
            tokio::fs::remove_file(from).await.map_err(|e| {
                Error::MoveFile(format!(
                    "failed to remove source {}: {}",
                    from.display(),
                    e
                ))
            })?;
            Ok(())
        }
    }
}

/// Create a directory (and any missing parents) if it does not exist
///
/// Fails if the path exists but is not a directory.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| Error::DownloadDir(format!("{}: {}", path.display(), e)))
}

/// Remove everything inside a directory without removing the directory itself
pub async fn clean_dir(path: &Path) -> Result<()> {
    let mut entries = tokio::fs::read_dir(path)
        .await
        .map_err(|e| Error::DownloadDir(format!("{}: {}", path.display(), e)))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::DownloadDir(format!("{}: {}", path.display(), e)))?
    {
        let entry_path = entry.path();
        let result = if entry_path.is_dir() {
            tokio::fs::remove_dir_all(&entry_path).await
        } else {
            tokio::fs::remove_file(&entry_path).await
        };
        if let Err(e) = result {
            tracing::warn!(path = %entry_path.display(), error = %e, "Failed to remove stale entry");
        }
    }
    Ok(())
}
