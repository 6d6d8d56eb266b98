//! Directory operations

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::PromoterError;

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Delete the directory and all contents
    pub async fn delete(&self) -> Result<(), PromoterError> {
        if self.exists().await {
            fs::remove_dir_all(&self.path).await?;
        }
        Ok(())
    }

    /// Create a uniquely named directory under the system temp dir
    pub async fn create_temp_dir(prefix: &str) -> Result<Dir, PromoterError> {
        Self::create_unique_in(&std::env::temp_dir(), prefix).await
    }

    /// Create `{parent}/{prefix}-{uuid}`
    pub async fn create_unique_in(parent: &Path, prefix: &str) -> Result<Dir, PromoterError> {
        let dir = parent.join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).await?;
        Ok(Dir::new(dir))
    }
}
