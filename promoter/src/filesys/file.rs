//! File operations

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::PromoterError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, PromoterError> {
        Ok(fs::read_to_string(&self.path).await?)
    }

    /// Replace the file contents through a sibling temporary file and a rename.
    ///
    /// The permissions of an existing file are carried over to the new one.
    pub async fn write_atomic(&self, contents: &[u8]) -> Result<(), PromoterError> {
        let mut temp_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| OsString::from("file"));
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);

        if let Err(e) = self.write_replacement(&temp_path, contents).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }
        Ok(())
    }

    async fn write_replacement(&self, temp_path: &Path, contents: &[u8]) -> Result<(), PromoterError> {
        let permissions = match fs::metadata(&self.path).await {
            Ok(metadata) => Some(metadata.permissions()),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let mut file = fs::File::create(temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        if let Some(permissions) = permissions {
            fs::set_permissions(temp_path, permissions).await?;
        }
        fs::rename(temp_path, &self.path).await?;
        Ok(())
    }
}
