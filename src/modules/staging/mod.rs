//! Local filesystem staging
//!
//! Two directories hold videos between remote transfer and encoding:
//! raw downloads and processed encoder output.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::config::StagingConfig;

/// The raw and processed staging directories
#[derive(Debug, Clone)]
pub struct StagingArea {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
}

impl StagingArea {
    pub fn new(raw_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    pub fn from_config(config: &StagingConfig) -> Self {
        Self::new(config.raw_dir.clone(), config.processed_dir.clone())
    }

    /// Create both staging directories if missing
    pub async fn setup_directories(&self) -> io::Result<()> {
        ensure_directory_exists(&self.raw_dir).await?;
        ensure_directory_exists(&self.processed_dir).await
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    /// Local path of a raw video
    pub fn raw_path(&self, file_name: &str) -> PathBuf {
        self.raw_dir.join(file_name)
    }

    /// Local path of a processed video
    pub fn processed_path(&self, file_name: &str) -> PathBuf {
        self.processed_dir.join(file_name)
    }

    pub async fn delete_raw_video(&self, file_name: &str) -> io::Result<()> {
        delete_file(&self.raw_path(file_name)).await
    }

    pub async fn delete_processed_video(&self, file_name: &str) -> io::Result<()> {
        delete_file(&self.processed_path(file_name)).await
    }
}

/// Create a directory and its parents unless it already exists
///
/// A non-directory already sitting at `dir_path` is an error.
pub async fn ensure_directory_exists(dir_path: &Path) -> io::Result<()> {
    let existed = match tokio::fs::metadata(dir_path).await {
        Ok(_) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => return Err(e),
    };

    tokio::fs::create_dir_all(dir_path).await?;
    if !existed {
        info!("Directory created @ {}", dir_path.display());
    }
    Ok(())
}

/// Delete a file; an absent file is not an error
pub async fn delete_file(file_path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(file_path).await {
        Ok(()) => {
            info!("File deleted at {}", file_path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(
                "File not found at {}, skipping delete.",
                file_path.display()
            );
            Ok(())
        }
        Err(e) => {
            warn!("Failed to delete file at {}: {}", file_path.display(), e);
            Err(e)
        }
    }
}
