use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use bytes::Bytes;
use tokio_util::io::ReaderStream;

use crate::error::{ApiResponse, AppError, Result};
use crate::models::{DeleteFileResponse, FileInfo, UploadFileResponse};
use crate::services::UploadFileParam;
use crate::AppState;

/// Bytes inspected when sniffing the content type
const SNIFF_LEN: usize = 512;

/// Split a client file name into stored name and extension.
///
/// The name stops at the first `.`, the extension starts after the last one,
/// so `archive.tar.gz` becomes (`archive`, `gz`).
pub fn parse_file_name(file_name: &str) -> (String, String) {
    let name = file_name.split('.').next().unwrap_or_default().to_string();
    let extension = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_string(),
        None => String::new(),
    };
    (name, extension)
}

/// Detect the content type from the leading bytes of an upload
pub fn detect_mimetype(data: &[u8]) -> String {
    let sample = &data[..data.len().min(SNIFF_LEN)];

    if let Some(kind) = infer::get(sample) {
        return kind.mime_type().to_string();
    }

    // a multi-byte char cut by the sample boundary still counts as text
    match std::str::from_utf8(sample) {
        Ok(_) => "text/plain; charset=utf-8".to_string(),
        Err(e) if e.error_len().is_none() => "text/plain; charset=utf-8".to_string(),
        Err(_) => "application/octet-stream".to_string(),
    }
}

/// Upload a file
/// POST /file
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadFileResponse>>> {
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to process multipart: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(|e| {
            AppError::BadRequest(format!("Failed to read file: {}", e))
        })?;
        upload = Some((file_name, data));
    }

    let (file_name, data) =
        upload.ok_or_else(|| AppError::BadRequest("invalid file is not specified".to_string()))?;

    if data.len() > state.config.upload.max_form_size {
        return Err(AppError::BadRequest(format!(
            "file exceeds the {} bytes limit",
            state.config.upload.max_form_size
        )));
    }

    let (name, extension) = parse_file_name(&file_name);
    let mimetype = detect_mimetype(&data);
    let size = data.len() as i64;

    let directory = format!(
        "{}/{}",
        state.config.storage.upload_dir.trim_end_matches('/'),
        state.location.location()
    );

    let param = UploadFileParam::builder()
        .data(data)
        .directory(directory)
        .file_info(FileInfo::new(name, mimetype, extension, size))
        .build()?;

    let uploaded = state.uploader.upload_file(param).await?;

    Ok(Json(ApiResponse::success_with_message(
        "success upload file",
        UploadFileResponse {
            id: uploaded.unique_id,
            name: uploaded.name,
            mimetype: uploaded.mimetype,
            extension: uploaded.extension,
            size: uploaded.size,
            uploaded_at: uploaded.uploaded_at.timestamp_millis(),
        },
    )))
}

/// Stream a file back
/// GET /file/:unique_id
pub async fn retrieve_file(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<Response> {
    let file = state.retriever.retrieve_file(&unique_id).await?;

    let file_name = if file.extension.is_empty() {
        file.name.clone()
    } else {
        format!("{}.{}", file.name, file.extension)
    };
    let fallback_name = file_name.replace(['"', '\\'], "_");
    let encoded_name = urlencoding::encode(&file_name);

    let body = Body::from_stream(ReaderStream::new(file.data));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.mimetype)
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "inline; filename=\"{}\"; filename*=UTF-8''{}",
                fallback_name, encoded_name
            ),
        )
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Soft delete a file and remove its blob
/// DELETE /file/:unique_id
pub async fn delete_file(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<Json<ApiResponse<DeleteFileResponse>>> {
    let deleted = state.deleter.delete_file(&unique_id).await?;

    Ok(Json(ApiResponse::success_with_message(
        "success delete file",
        DeleteFileResponse {
            deleted_at: deleted.deleted_at.timestamp_millis(),
        },
    )))
}
