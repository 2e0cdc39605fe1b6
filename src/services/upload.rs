use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{AppError, Result};
use crate::identifier::Identifier;
use crate::models::FileInfo;
use crate::repository::{BlobFuture, CreateFileParam, CreateFn, CreateFnParam, FileRepository};
use crate::storage::{BlobStore, DIRECTORY_MODE, FILE_MODE};

/// Where upload bytes come from
pub enum UploadSource {
    Data(Bytes),
    Reader(Box<dyn AsyncRead + Send + Unpin>),
}

/// Validated upload request. Build with [`UploadFileParam::builder`].
pub struct UploadFileParam {
    source: UploadSource,
    directory: String,
    info: FileInfo,
}

impl UploadFileParam {
    pub fn builder() -> UploadFileParamBuilder {
        UploadFileParamBuilder::default()
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn info(&self) -> &FileInfo {
        &self.info
    }
}

#[derive(Default)]
pub struct UploadFileParamBuilder {
    source: Option<UploadSource>,
    directory: Option<String>,
    info: FileInfo,
}

impl UploadFileParamBuilder {
    /// Upload from an in-memory buffer. Replaces any reader set before.
    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.source = Some(UploadSource::Data(data.into()));
        self
    }

    /// Upload from a stream, read fully before the blob is written.
    /// Replaces any buffer set before.
    pub fn reader(mut self, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        self.source = Some(UploadSource::Reader(Box::new(reader)));
        self
    }

    pub fn directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn file_info(mut self, info: FileInfo) -> Self {
        self.info = info;
        self
    }

    pub fn build(self) -> Result<UploadFileParam> {
        let source = self
            .source
            .ok_or_else(|| AppError::BadRequest("invalid file is not specified".to_string()))?;

        let directory = self
            .directory
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| {
                AppError::BadRequest("invalid upload directory is not specified".to_string())
            })?;

        Ok(UploadFileParam {
            source,
            directory,
            info: self.info,
        })
    }
}

/// Created record projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFileResult {
    pub unique_id: String,
    pub name: String,
    pub path: String,
    pub mimetype: String,
    pub extension: String,
    pub size: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Blob address for a new upload: `{directory}/{id}[.{extension}]`
pub fn file_path(directory: &str, unique_id: &str, extension: &str) -> String {
    let directory = directory.trim_end_matches('/');
    if extension.is_empty() {
        format!("{}/{}", directory, unique_id)
    } else {
        format!("{}/{}.{}", directory, unique_id, extension)
    }
}

fn new_create_fn(data: Bytes, blob_store: Arc<dyn BlobStore>) -> CreateFn {
    Box::new(move |param: CreateFnParam| -> BlobFuture {
        Box::pin(async move {
            // ids are fresh, so a hit here means the generator is broken
            if blob_store.exists(&param.file_path).await? {
                return Err(AppError::ResourceExists(param.file_path));
            }

            blob_store.write(&param.file_path, data, FILE_MODE).await
        })
    })
}

pub struct NewUploaderParam {
    pub file_repo: Arc<dyn FileRepository>,
    pub blob_store: Arc<dyn BlobStore>,
    pub identifier: Arc<dyn Identifier>,
}

/// Upload service
pub struct Uploader {
    file_repo: Arc<dyn FileRepository>,
    blob_store: Arc<dyn BlobStore>,
    identifier: Arc<dyn Identifier>,
}

impl Uploader {
    pub fn new(p: NewUploaderParam) -> Self {
        Self {
            file_repo: p.file_repo,
            blob_store: p.blob_store,
            identifier: p.identifier,
        }
    }

    /// Store a new file: metadata row and blob, both or neither
    pub async fn upload_file(&self, param: UploadFileParam) -> Result<UploadFileResult> {
        tracing::debug!(directory = %param.directory, name = %param.info.name, "Uploading file");

        self.blob_store
            .ensure_directory(&param.directory, DIRECTORY_MODE)
            .await?;

        let data = match param.source {
            UploadSource::Data(data) => data,
            UploadSource::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await?;
                Bytes::from(buf)
            }
        };

        let unique_id = self.identifier.generate_id()?;
        let path = file_path(&param.directory, &unique_id, &param.info.extension);

        let created = self
            .file_repo
            .create_file(
                CreateFileParam {
                    unique_id,
                    name: param.info.name,
                    path,
                    mimetype: param.info.mimetype,
                    extension: param.info.extension,
                    size: param.info.size,
                },
                new_create_fn(data, self.blob_store.clone()),
            )
            .await?;

        tracing::debug!(unique_id = %created.unique_id, path = %created.path, "Uploaded file");

        Ok(UploadFileResult {
            unique_id: created.unique_id,
            name: created.name,
            path: created.path,
            mimetype: created.mimetype,
            extension: created.extension,
            size: created.size,
            uploaded_at: created.created_at,
        })
    }
}
