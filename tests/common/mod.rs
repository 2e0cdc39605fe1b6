//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use filekeep::clock::FixedClock;
use filekeep::config::DatabaseConfig;
use filekeep::db::Database;
use filekeep::error::{AppError, Result};
use filekeep::identifier::Identifier;
use filekeep::storage::{BlobReader, BlobStore, LocalBlobStore};

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 3, 14, 15, 9, 26).unwrap()
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(fixed_time()))
}

/// File backed database so separate pool connections see the same data
pub async fn create_test_database(dir: &TempDir) -> Database {
    let config = DatabaseConfig {
        path: dir.path().join("test.db").to_string_lossy().into_owned(),
        max_connections: 4,
        busy_timeout_secs: 5,
        acquire_timeout_secs: 5,
    };

    let db = Database::new(&config).await.unwrap();
    db.run_migrations().await.unwrap();
    db
}

pub fn dir_path(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().into_owned()
}

/// Hands out `FILE-0001`, `FILE-0002`, ...
#[derive(Default)]
pub struct SequenceIdentifier {
    next: AtomicUsize,
}

impl Identifier for SequenceIdentifier {
    fn generate_id(&self) -> Result<String> {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("FILE-{:04}", n))
    }
}

/// Local store that counts removals
#[derive(Default)]
pub struct CountingBlobStore {
    inner: LocalBlobStore,
    pub removed: AtomicUsize,
}

impl CountingBlobStore {
    pub fn removed(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for CountingBlobStore {
    async fn exists(&self, path: &str) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn open(&self, path: &str) -> Result<BlobReader> {
        self.inner.open(path).await
    }

    async fn write(&self, path: &str, data: Bytes, mode: u32) -> Result<()> {
        self.inner.write(path, data, mode).await
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.inner.remove(path).await?;
        self.removed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ensure_directory(&self, path: &str, mode: u32) -> Result<()> {
        self.inner.ensure_directory(path, mode).await
    }

    fn storage_type(&self) -> &'static str {
        "counting"
    }
}

/// Store whose writes and removals fail as if the directory were read-only
#[derive(Default)]
pub struct ReadOnlyBlobStore {
    inner: LocalBlobStore,
}

fn permission_denied(path: &str) -> AppError {
    AppError::Io(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        format!("permission denied: {}", path),
    ))
}

#[async_trait]
impl BlobStore for ReadOnlyBlobStore {
    async fn exists(&self, path: &str) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn open(&self, path: &str) -> Result<BlobReader> {
        self.inner.open(path).await
    }

    async fn write(&self, path: &str, _data: Bytes, _mode: u32) -> Result<()> {
        Err(permission_denied(path))
    }

    async fn remove(&self, path: &str) -> Result<()> {
        Err(permission_denied(path))
    }

    async fn ensure_directory(&self, path: &str, mode: u32) -> Result<()> {
        self.inner.ensure_directory(path, mode).await
    }

    fn storage_type(&self) -> &'static str {
        "read-only"
    }
}
