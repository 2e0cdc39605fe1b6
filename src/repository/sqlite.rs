use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};
use std::sync::Arc;

use crate::clock::Clock;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{FileRecord, FileRow};
use crate::repository::{
    CreateFileParam, CreateFileResult, CreateFn, CreateFnParam, DeleteFileResult, DeleteFn,
    DeleteFnParam, FileRepository,
};

const SELECT_FILE: &str = r#"
    SELECT
        unique_id, name, path,
        mimetype, extension, size,
        created_at, updated_at, deleted_at
    FROM file
    WHERE unique_id = ?
"#;

/// SQLite backed file repository
#[derive(Clone)]
pub struct SqliteFileRepository {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl SqliteFileRepository {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Start a transaction holding the database write lock.
    ///
    /// SQLite has no `SELECT ... FOR UPDATE`; `BEGIN IMMEDIATE` takes the write
    /// lock up front, so rows read afterwards cannot change until we finish.
    async fn begin_locked(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.db.pool().begin_with("BEGIN IMMEDIATE").await?)
    }

    async fn find_file<'e, E>(executor: E, unique_id: &str) -> Result<FileRecord>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let row: Option<FileRow> = sqlx::query_as(SELECT_FILE)
            .bind(unique_id.to_string())
            .fetch_optional(executor)
            .await
            .map_err(map_row_error)?;

        let row = row.ok_or_else(|| AppError::RecordNotFound(unique_id.to_string()))?;
        FileRecord::try_from(row)
    }
}

/// Decode failures mean the schema and the code disagree.
fn map_row_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_) => AppError::Integrity(e.to_string()),
        other => AppError::Database(other),
    }
}

/// Roll back and hand back the error to report.
///
/// A failed rollback wins over `cause`: the caller must know the final state
/// of the transaction is unknown.
async fn rollback(tx: Transaction<'static, Sqlite>, cause: AppError) -> AppError {
    match tx.rollback().await {
        Ok(()) => cause,
        Err(e) => {
            tracing::error!(error = %e, cause = %cause, "Failed to rollback transaction");
            AppError::Rollback {
                source: e,
                cause: cause.to_string(),
            }
        }
    }
}

#[async_trait]
impl FileRepository for SqliteFileRepository {
    async fn create_file(
        &self,
        param: CreateFileParam,
        create_fn: CreateFn,
    ) -> Result<CreateFileResult> {
        let created_at = self.clock.now();
        let timestamp = created_at.to_rfc3339();

        let mut tx = self.begin_locked().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO file (unique_id, name, path, mimetype, extension, size, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&param.unique_id)
        .bind(&param.name)
        .bind(&param.path)
        .bind(&param.mimetype)
        .bind(&param.extension)
        .bind(param.size)
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            return Err(rollback(tx, e.into()).await);
        }

        let blob = create_fn(CreateFnParam {
            file_path: param.path.clone(),
        })
        .await;

        if let Err(e) = blob {
            return Err(rollback(tx, e).await);
        }

        tx.commit().await?;

        Ok(CreateFileResult {
            unique_id: param.unique_id,
            name: param.name,
            path: param.path,
            mimetype: param.mimetype,
            extension: param.extension,
            size: param.size,
            created_at,
        })
    }

    async fn retrieve_file(&self, unique_id: &str) -> Result<FileRecord> {
        let file = Self::find_file(self.db.pool(), unique_id).await?;

        if file.is_deleted() {
            return Err(AppError::RecordDeleted(unique_id.to_string()));
        }

        Ok(file)
    }

    async fn delete_file(
        &self,
        unique_id: &str,
        delete_fn: DeleteFn,
    ) -> Result<DeleteFileResult> {
        let deleted_at = self.clock.now();
        let timestamp = deleted_at.to_rfc3339();

        let mut tx = self.begin_locked().await?;

        let file = match Self::find_file(&mut *tx, unique_id).await {
            Ok(file) => file,
            Err(e) => return Err(rollback(tx, e).await),
        };

        if file.is_deleted() {
            let cause = AppError::RecordDeleted(unique_id.to_string());
            return Err(rollback(tx, cause).await);
        }

        let updated = sqlx::query(
            "UPDATE file SET deleted_at = ?, updated_at = ? WHERE unique_id = ? AND deleted_at IS NULL",
        )
        .bind(&timestamp)
        .bind(&timestamp)
        .bind(&file.unique_id)
        .execute(&mut *tx)
        .await;

        let updated = match updated {
            Ok(result) => result,
            Err(e) => return Err(rollback(tx, e.into()).await),
        };

        // anything but one row means the lock did not hold
        if updated.rows_affected() != 1 {
            let cause = AppError::Integrity(format!(
                "record is not updated: {} rows affected for {}",
                updated.rows_affected(),
                unique_id
            ));
            return Err(rollback(tx, cause).await);
        }

        let blob = delete_fn(DeleteFnParam {
            file_path: file.path.clone(),
        })
        .await;

        if let Err(e) = blob {
            return Err(rollback(tx, e).await);
        }

        tx.commit().await?;

        Ok(DeleteFileResult { deleted_at })
    }
}
