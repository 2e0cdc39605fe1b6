use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{BlobReader, BlobStore};

/// Local file system blob store. Paths are used as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBlobStore;

impl LocalBlobStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn exists(&self, path: &str) -> Result<bool> {
        match fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn open(&self, path: &str) -> Result<BlobReader> {
        let file = fs::File::open(path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                AppError::BlobNotFound(path.to_string())
            } else {
                AppError::Io(e)
            }
        })?;

        Ok(Box::new(file))
    }

    async fn write(&self, path: &str, data: Bytes, mode: u32) -> Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(mode);
        #[cfg(not(unix))]
        let _ = mode;

        let mut file = options.open(path).await.map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                AppError::ResourceExists(path.to_string())
            } else {
                AppError::Io(e)
            }
        })?;

        file.write_all(&data).await?;
        file.sync_all().await?;

        tracing::debug!("Saved blob to {}", path);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        fs::remove_file(path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                AppError::BlobNotFound(path.to_string())
            } else {
                AppError::Io(e)
            }
        })?;

        tracing::debug!("Removed blob {}", path);
        Ok(())
    }

    async fn ensure_directory(&self, path: &str, mode: u32) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(mode);
        #[cfg(not(unix))]
        let _ = mode;

        builder.create(path).await?;
        Ok(())
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}
