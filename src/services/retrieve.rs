use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::repository::FileRepository;
use crate::storage::{BlobReader, BlobStore};

/// Open blob plus the metadata needed to serve it.
/// The reader is released when this is dropped.
pub struct RetrieveFileResult {
    pub data: BlobReader,
    pub unique_id: String,
    pub name: String,
    pub path: String,
    pub mimetype: String,
    pub extension: String,
}

pub struct NewRetrieverParam {
    pub file_repo: Arc<dyn FileRepository>,
    pub blob_store: Arc<dyn BlobStore>,
}

/// Retrieve service
pub struct Retriever {
    file_repo: Arc<dyn FileRepository>,
    blob_store: Arc<dyn BlobStore>,
}

impl Retriever {
    pub fn new(p: NewRetrieverParam) -> Self {
        Self {
            file_repo: p.file_repo,
            blob_store: p.blob_store,
        }
    }

    /// Look up a live file and open its blob for reading
    pub async fn retrieve_file(&self, file_id: &str) -> Result<RetrieveFileResult> {
        tracing::debug!(file_id = %file_id, "Retrieving file");

        if file_id.trim().is_empty() {
            return Err(AppError::BadRequest("invalid file id parameter".to_string()));
        }

        let file = self
            .file_repo
            .retrieve_file(file_id)
            .await
            .map_err(|e| match e {
                AppError::RecordNotFound(id) | AppError::RecordDeleted(id) => {
                    AppError::ResourceNotFound(id)
                }
                other => other,
            })?;

        let data = self.blob_store.open(&file.path).await.map_err(|e| match e {
            AppError::BlobNotFound(path) => {
                tracing::warn!(file_id = %file_id, path = %path, "Record has no blob");
                AppError::ResourceNotFound(file_id.to_string())
            }
            other => other,
        })?;

        Ok(RetrieveFileResult {
            data,
            unique_id: file.unique_id,
            name: file.name,
            path: file.path,
            mimetype: file.mimetype,
            extension: file.extension,
        })
    }
}
