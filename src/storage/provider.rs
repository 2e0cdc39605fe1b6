use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::error::Result;

/// Permission mode for blob files (non-executable)
pub const FILE_MODE: u32 = 0o644;

/// Permission mode for upload directories
pub const DIRECTORY_MODE: u32 = 0o755;

/// Lazily read blob content. Dropping it releases the underlying handle.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Path addressed byte storage.
///
/// There is no transaction primitive here: each call is atomic on its own and
/// nothing more. Callers compose these with a metadata transaction.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Check if a blob exists
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Open a blob for streaming read.
    /// Returns `AppError::BlobNotFound` when nothing is stored at `path`.
    async fn open(&self, path: &str) -> Result<BlobReader>;

    /// Write a new blob. Never overwrites: an existing blob yields
    /// `AppError::ResourceExists`.
    async fn write(&self, path: &str, data: Bytes, mode: u32) -> Result<()>;

    /// Remove a blob.
    /// Returns `AppError::BlobNotFound` when nothing is stored at `path`.
    async fn remove(&self, path: &str) -> Result<()>;

    /// Create a directory and its parents if absent
    async fn ensure_directory(&self, path: &str, mode: u32) -> Result<()>;

    /// Get the storage type name
    fn storage_type(&self) -> &'static str;
}
