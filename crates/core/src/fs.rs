//! Filesystem helpers exposed through the facade.

use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::Path;

/// Create `path` and any missing parents. Existing directories are fine.
///
/// # Errors
///
/// Returns [`Error::Io`] if a component cannot be created or exists as a file.
pub async fn mkdirp(path: &Path) -> Result<()> {
    tracing::debug!(path = %path.display(), "Creating directory");
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| Error::io(e, Some(path.to_path_buf()), "create directory"))
}

/// Remove `path` recursively. A missing path is not an error.
///
/// # Errors
///
/// Returns [`Error::Io`] if the path exists but cannot be removed.
pub async fn rmrf(path: &Path) -> Result<()> {
    tracing::debug!(path = %path.display(), "Removing path");
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io(e, Some(path.to_path_buf()), "remove path")),
    };

    let removed = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match removed {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(e, Some(path.to_path_buf()), "remove path")),
    }
}
