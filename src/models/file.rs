use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::error::AppError;

/// Raw `file` row as stored in SQLite
#[derive(Debug, Clone, FromRow)]
pub struct FileRow {
    pub unique_id: String,
    pub name: String,
    pub path: String,
    pub mimetype: String,
    pub extension: String,
    pub size: i64,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

/// File metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub unique_id: String,
    pub name: String,
    /// Blob address; fixed at creation
    pub path: String,
    pub mimetype: String,
    pub extension: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AppError::Integrity(format!("invalid {} value {:?}: {}", column, value, e)))
}

impl TryFrom<FileRow> for FileRecord {
    type Error = AppError;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        let created_at = parse_timestamp("created_at", &row.created_at)?;
        let updated_at = parse_timestamp("updated_at", &row.updated_at)?;
        let deleted_at = row
            .deleted_at
            .as_deref()
            .map(|v| parse_timestamp("deleted_at", v))
            .transpose()?;

        Ok(Self {
            unique_id: row.unique_id,
            name: row.name,
            path: row.path,
            mimetype: row.mimetype,
            extension: row.extension,
            size: row.size,
            created_at,
            updated_at,
            deleted_at,
        })
    }
}

/// Declared file attributes supplied with an upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub mimetype: String,
    pub extension: String,
    pub size: i64,
}

impl FileInfo {
    pub fn new(
        name: impl Into<String>,
        mimetype: impl Into<String>,
        extension: impl Into<String>,
        size: i64,
    ) -> Self {
        Self {
            name: name.into(),
            mimetype: mimetype.into(),
            extension: extension.into(),
            size,
        }
    }
}

/// Upload response body
#[derive(Debug, Clone, Serialize)]
pub struct UploadFileResponse {
    pub id: String,
    pub name: String,
    pub mimetype: String,
    pub extension: String,
    pub size: i64,
    /// Unix milliseconds
    pub uploaded_at: i64,
}

/// Delete response body
#[derive(Debug, Clone, Serialize)]
pub struct DeleteFileResponse {
    /// Unix milliseconds
    pub deleted_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> FileRow {
        FileRow {
            unique_id: "01HZX".to_string(),
            name: "report".to_string(),
            path: "/tmp/x/01HZX.pdf".to_string(),
            mimetype: "application/pdf".to_string(),
            extension: "pdf".to_string(),
            size: 42,
            created_at: "2022-05-01T10:00:00+00:00".to_string(),
            updated_at: "2022-05-01T10:00:00+00:00".to_string(),
            deleted_at: None,
        }
    }

    #[test]
    fn maps_live_row() {
        let record = FileRecord::try_from(row()).unwrap();
        assert_eq!(record.unique_id, "01HZX");
        assert_eq!(record.size, 42);
        assert!(!record.is_deleted());
    }

    #[test]
    fn maps_soft_deleted_row() {
        let mut r = row();
        r.deleted_at = Some("2022-05-02T00:00:00Z".to_string());
        let record = FileRecord::try_from(r).unwrap();
        assert!(record.is_deleted());
    }

    #[test]
    fn bad_timestamp_is_an_integrity_violation() {
        let mut r = row();
        r.updated_at = "yesterday".to_string();
        let err = FileRecord::try_from(r).unwrap_err();
        assert!(matches!(err, AppError::Integrity(_)));
    }
}
