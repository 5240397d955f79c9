//! Application directory resolution.
//!
//! Resolution order for the data root:
//! 1. `KIRLIAN_DATA_DIR` environment variable
//! 2. System data directory (e.g. `~/.local/share/kirlian`)

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors that can occur during path resolution and directory creation.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the system data directory.
    #[error("Cannot determine system data directory")]
    NoDataDir,

    /// A path was expected to be a directory but was not.
    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    /// Failed to create a directory.
    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },
}

/// Root directory for logs, pidfiles and rendered pages.
pub fn data_root() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var("KIRLIAN_DATA_DIR") {
        if !path.trim().is_empty() {
            let root = PathBuf::from(path);
            ensure_dir(&root)?;
            return Ok(root);
        }
    }

    let root = dirs::data_local_dir()
        .ok_or(PathError::NoDataDir)?
        .join("kirlian");
    ensure_dir(&root)?;
    Ok(root)
}

/// Directory for daily rolling log files.
pub fn logs_dir() -> Result<PathBuf, PathError> {
    let dir = data_root()?.join("logs");
    ensure_dir(&dir)?;
    Ok(dir)
}

/// Directory for backend pidfiles.
pub fn pids_dir() -> Result<PathBuf, PathError> {
    let dir = data_root()?.join("pids");
    ensure_dir(&dir)?;
    Ok(dir)
}

fn ensure_dir(path: &Path) -> Result<(), PathError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(PathError::NotADirectory(path.to_path_buf()));
        }
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), "Created directory");
    Ok(())
}
