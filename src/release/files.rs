//! Output directory housekeeping

use crate::core::ReleaseError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Delete files directly inside `dir` whose extension is in `extensions`
///
/// Subdirectories and other files are left alone. Returns `None` when the
/// directory does not exist.
pub async fn clean_stale(dir: &Path, extensions: &[String]) -> Result<Option<Vec<PathBuf>>, ReleaseError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut removed = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let stale = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
        if stale {
            tokio::fs::remove_file(&path).await?;
            debug!("Removed stale output {}", path.display());
            removed.push(path);
        }
    }
    removed.sort();
    Ok(Some(removed))
}

/// Write `contents` to `path`, creating parent directories
pub async fn write_file(path: &Path, contents: &[u8]) -> Result<(), ReleaseError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// `<dir>/<base version>.md`
pub fn notes_path(dir: &Path, base_version: &str) -> PathBuf {
    dir.join(format!("{}.md", base_version))
}
