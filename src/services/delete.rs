use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::repository::{BlobFuture, DeleteFileResult, DeleteFn, DeleteFnParam, FileRepository};
use crate::storage::BlobStore;

/// Removes the blob of a row being soft deleted.
///
/// A blob that is already gone is not an error: the row is the source of truth,
/// and failing here would leave the record undeletable forever.
fn new_delete_fn(blob_store: Arc<dyn BlobStore>) -> DeleteFn {
    Box::new(move |param: DeleteFnParam| -> BlobFuture {
        Box::pin(async move {
            if !blob_store.exists(&param.file_path).await? {
                tracing::warn!(path = %param.file_path, "Blob already missing, soft deleting record only");
                return Ok(());
            }

            match blob_store.remove(&param.file_path).await {
                Err(AppError::BlobNotFound(path)) => {
                    tracing::warn!(path = %path, "Blob vanished before removal");
                    Ok(())
                }
                other => other,
            }
        })
    })
}

pub struct NewDeleterParam {
    pub file_repo: Arc<dyn FileRepository>,
    pub blob_store: Arc<dyn BlobStore>,
}

/// Delete service
pub struct Deleter {
    file_repo: Arc<dyn FileRepository>,
    blob_store: Arc<dyn BlobStore>,
}

impl Deleter {
    pub fn new(p: NewDeleterParam) -> Self {
        Self {
            file_repo: p.file_repo,
            blob_store: p.blob_store,
        }
    }

    /// Soft delete a file and remove its blob, both or neither
    pub async fn delete_file(&self, file_id: &str) -> Result<DeleteFileResult> {
        tracing::debug!(file_id = %file_id, "Deleting file");

        if file_id.trim().is_empty() {
            return Err(AppError::BadRequest("invalid file id parameter".to_string()));
        }

        let res = self
            .file_repo
            .delete_file(file_id, new_delete_fn(self.blob_store.clone()))
            .await
            .map_err(|e| match e {
                AppError::RecordNotFound(id) => AppError::ResourceNotFound(id),
                other => other,
            })?;

        tracing::debug!(file_id = %file_id, deleted_at = %res.deleted_at, "Deleted file");
        Ok(res)
    }
}
