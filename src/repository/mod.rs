//! Metadata repository.
//!
//! The repository owns the `file` table and composes each mutation with a blob
//! store side effect supplied by the caller. The callback runs once, inside the
//! open transaction; the transaction commits only if both the row change and the
//! callback succeed.
//!
//! A blob write that succeeds followed by a failed commit leaves an orphan blob
//! with no row pointing at it. Sweeping such orphans is an operational task.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::models::FileRecord;

pub mod sqlite;

pub use sqlite::SqliteFileRepository;

/// Future returned by a blob side effect
pub type BlobFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Blob write performed while the insert is uncommitted
pub type CreateFn = Box<dyn FnOnce(CreateFnParam) -> BlobFuture + Send>;

/// Blob removal performed while the soft delete is uncommitted
pub type DeleteFn = Box<dyn FnOnce(DeleteFnParam) -> BlobFuture + Send>;

#[derive(Debug, Clone)]
pub struct CreateFnParam {
    pub file_path: String,
}

#[derive(Debug, Clone)]
pub struct DeleteFnParam {
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFileParam {
    pub unique_id: String,
    pub name: String,
    pub path: String,
    pub mimetype: String,
    pub extension: String,
    pub size: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFileResult {
    pub unique_id: String,
    pub name: String,
    pub path: String,
    pub mimetype: String,
    pub extension: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteFileResult {
    pub deleted_at: DateTime<Utc>,
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Insert a row and run `create_fn` with its blob path, both or neither.
    ///
    /// A failing `create_fn` rolls the insert back and its error is returned.
    /// If the rollback itself fails, `AppError::Rollback` is returned instead.
    async fn create_file(
        &self,
        param: CreateFileParam,
        create_fn: CreateFn,
    ) -> Result<CreateFileResult>;

    /// Read a row outside any transaction.
    ///
    /// Unknown ids give `AppError::RecordNotFound`, soft-deleted rows give
    /// `AppError::RecordDeleted`. The blob store is not touched.
    async fn retrieve_file(&self, unique_id: &str) -> Result<FileRecord>;

    /// Soft delete a row and run `delete_fn` with its blob path, both or neither.
    ///
    /// The row is locked before it is read, so concurrent deletes of one id
    /// serialize: the later one sees `AppError::RecordDeleted`.
    async fn delete_file(&self, unique_id: &str, delete_fn: DeleteFn)
        -> Result<DeleteFileResult>;
}
