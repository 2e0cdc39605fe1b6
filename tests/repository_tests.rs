//! Transaction behavior of the SQLite file repository

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{create_test_database, fixed_clock, fixed_time};
use filekeep::error::AppError;
use filekeep::repository::{
    BlobFuture, CreateFileParam, CreateFn, CreateFnParam, DeleteFn, DeleteFnParam,
    FileRepository, SqliteFileRepository,
};

fn create_param(unique_id: &str) -> CreateFileParam {
    CreateFileParam {
        unique_id: unique_id.to_string(),
        name: "report".to_string(),
        path: format!("/var/files/{}.pdf", unique_id),
        mimetype: "application/pdf".to_string(),
        extension: "pdf".to_string(),
        size: 2048,
    }
}

fn ok_create() -> CreateFn {
    Box::new(|_: CreateFnParam| -> BlobFuture { Box::pin(async { Ok(()) }) })
}

fn ok_delete() -> DeleteFn {
    Box::new(|_: DeleteFnParam| -> BlobFuture { Box::pin(async { Ok(()) }) })
}

fn failing_delete() -> DeleteFn {
    Box::new(|p: DeleteFnParam| -> BlobFuture {
        Box::pin(async move { Err(AppError::Internal(format!("cannot remove {}", p.file_path))) })
    })
}

async fn create_test_repository(dir: &tempfile::TempDir) -> SqliteFileRepository {
    let db = create_test_database(dir).await;
    SqliteFileRepository::new(db, fixed_clock())
}

#[tokio::test]
async fn test_create_and_retrieve() {
    let dir = tempfile::tempdir().unwrap();
    let repo = create_test_repository(&dir).await;

    let seen = Arc::new(std::sync::Mutex::new(None));
    let seen_in_fn = seen.clone();
    let create_fn: CreateFn = Box::new(move |p: CreateFnParam| -> BlobFuture {
        *seen_in_fn.lock().unwrap() = Some(p.file_path);
        Box::pin(async { Ok(()) })
    });

    let created = repo.create_file(create_param("F1"), create_fn).await.unwrap();
    assert_eq!(created.created_at, fixed_time());
    assert_eq!(
        seen.lock().unwrap().as_deref(),
        Some("/var/files/F1.pdf"),
        "callback receives the stored path"
    );

    let file = repo.retrieve_file("F1").await.unwrap();
    assert_eq!(file.name, "report");
    assert_eq!(file.path, "/var/files/F1.pdf");
    assert_eq!(file.mimetype, "application/pdf");
    assert_eq!(file.extension, "pdf");
    assert_eq!(file.size, 2048);
    assert_eq!(file.created_at, fixed_time());
    assert_eq!(file.updated_at, fixed_time());
    assert!(file.deleted_at.is_none());
}

#[tokio::test]
async fn test_failed_create_callback_leaves_no_row() {
    let dir = tempfile::tempdir().unwrap();
    let repo = create_test_repository(&dir).await;

    let create_fn: CreateFn = Box::new(|_: CreateFnParam| -> BlobFuture {
        Box::pin(async { Err(AppError::Internal("disk full".to_string())) })
    });

    let err = repo.create_file(create_param("F1"), create_fn).await.unwrap_err();
    assert!(matches!(err, AppError::Internal(ref m) if m == "disk full"));

    let err = repo.retrieve_file("F1").await.unwrap_err();
    assert!(matches!(err, AppError::RecordNotFound(_)));
}

#[tokio::test]
async fn test_duplicate_id_skips_callback() {
    let dir = tempfile::tempdir().unwrap();
    let repo = create_test_repository(&dir).await;
    repo.create_file(create_param("F1"), ok_create()).await.unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_fn = calls.clone();
    let create_fn: CreateFn = Box::new(move |_: CreateFnParam| -> BlobFuture {
        calls_in_fn.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    });

    let err = repo.create_file(create_param("F1"), create_fn).await.unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_retrieve_unknown_and_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let repo = create_test_repository(&dir).await;

    let err = repo.retrieve_file("missing").await.unwrap_err();
    assert!(matches!(err, AppError::RecordNotFound(_)));

    repo.create_file(create_param("F1"), ok_create()).await.unwrap();
    repo.delete_file("F1", ok_delete()).await.unwrap();

    let err = repo.retrieve_file("F1").await.unwrap_err();
    assert!(matches!(err, AppError::RecordDeleted(_)));
}

#[tokio::test]
async fn test_delete_sets_deleted_at() {
    let dir = tempfile::tempdir().unwrap();
    let db = create_test_database(&dir).await;
    let repo = SqliteFileRepository::new(db.clone(), fixed_clock());
    repo.create_file(create_param("F1"), ok_create()).await.unwrap();

    let deleted = repo.delete_file("F1", ok_delete()).await.unwrap();
    assert_eq!(deleted.deleted_at, fixed_time());

    let (deleted_at,): (Option<String>,) =
        sqlx::query_as("SELECT deleted_at FROM file WHERE unique_id = ?")
            .bind("F1")
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(deleted_at, Some(fixed_time().to_rfc3339()));
}

#[tokio::test]
async fn test_failed_delete_callback_keeps_row_live() {
    let dir = tempfile::tempdir().unwrap();
    let repo = create_test_repository(&dir).await;
    repo.create_file(create_param("F1"), ok_create()).await.unwrap();

    let err = repo.delete_file("F1", failing_delete()).await.unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));

    let file = repo.retrieve_file("F1").await.unwrap();
    assert!(file.deleted_at.is_none());
}

#[tokio::test]
async fn test_delete_unknown_and_twice() {
    let dir = tempfile::tempdir().unwrap();
    let repo = create_test_repository(&dir).await;

    let err = repo.delete_file("missing", ok_delete()).await.unwrap_err();
    assert!(matches!(err, AppError::RecordNotFound(_)));

    repo.create_file(create_param("F1"), ok_create()).await.unwrap();
    repo.delete_file("F1", ok_delete()).await.unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_fn = calls.clone();
    let delete_fn: DeleteFn = Box::new(move |_: DeleteFnParam| -> BlobFuture {
        calls_in_fn.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    });

    let err = repo.delete_file("F1", delete_fn).await.unwrap_err();
    assert!(matches!(err, AppError::RecordDeleted(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_corrupt_timestamp_is_integrity_violation() {
    let dir = tempfile::tempdir().unwrap();
    let db = create_test_database(&dir).await;
    let repo = SqliteFileRepository::new(db.clone(), fixed_clock());

    sqlx::query(
        r#"
        INSERT INTO file (unique_id, name, path, mimetype, extension, size, created_at, updated_at)
        VALUES ('F1', 'a', '/tmp/F1.txt', 'text/plain', 'txt', 1, 'yesterday', 'yesterday')
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let err = repo.retrieve_file("F1").await.unwrap_err();
    assert!(matches!(err, AppError::Integrity(_)));
}

#[tokio::test]
async fn test_cancelled_create_rolls_back_and_releases_lock() {
    let dir = tempfile::tempdir().unwrap();
    let repo = create_test_repository(&dir).await;

    let stalled: CreateFn = Box::new(|_: CreateFnParam| -> BlobFuture {
        Box::pin(std::future::pending::<filekeep::error::Result<()>>())
    });

    let cancelled =
        tokio::time::timeout(Duration::from_millis(100), repo.create_file(create_param("C1"), stalled))
            .await;
    assert!(cancelled.is_err(), "stalled create should time out");

    // the write lock must be free again well inside the busy timeout
    let next = tokio::time::timeout(
        Duration::from_secs(2),
        repo.create_file(create_param("C2"), ok_create()),
    )
    .await
    .expect("write lock still held after cancellation");
    next.unwrap();

    let err = repo.retrieve_file("C1").await.unwrap_err();
    assert!(matches!(err, AppError::RecordNotFound(_)));
    repo.retrieve_file("C2").await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deletes_remove_once() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(create_test_repository(&dir).await);
    repo.create_file(create_param("F1"), ok_create()).await.unwrap();

    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let repo = repo.clone();
        let calls = calls.clone();
        handles.push(tokio::spawn(async move {
            let delete_fn: DeleteFn = Box::new(move |_: DeleteFnParam| -> BlobFuture {
                Box::pin(async move {
                    // hold the lock long enough for the other delete to queue up
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            });
            repo.delete_file("F1", delete_fn).await
        }));
    }

    let mut ok = 0;
    let mut already_deleted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(AppError::RecordDeleted(_)) => already_deleted += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(already_deleted, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
