use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sysinfo::Disks;

use crate::clock::Clock;
use crate::db::Database;

pub const STATUS_OK: &str = "OK";
pub const STATUS_WARNING: &str = "WARNING";
pub const STATUS_FAILED: &str = "FAILED";

/// Outcome of one health job
#[derive(Debug, Clone, Serialize)]
pub struct HealthDetail {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub details: BTreeMap<String, HealthDetail>,
}

pub struct NewHealthServiceParam {
    pub db: Database,
    pub upload_dir: PathBuf,
    pub clock: Arc<dyn Clock>,
    /// Percent of the upload disk in use that fails the check; `<= 0` skips it
    pub disk_usage_threshold: f64,
}

/// On-demand checks of the metadata database, the upload directory and its disk
#[derive(Clone)]
pub struct HealthService {
    db: Database,
    upload_dir: PathBuf,
    clock: Arc<dyn Clock>,
    disk_usage_threshold: f64,
}

impl HealthService {
    pub fn new(p: NewHealthServiceParam) -> Self {
        Self {
            db: p.db,
            upload_dir: p.upload_dir,
            clock: p.clock,
            disk_usage_threshold: p.disk_usage_threshold,
        }
    }

    pub async fn check(&self) -> HealthStatus {
        let mut jobs = vec![
            ("database", self.check_database().await),
            ("upload-directory", self.check_upload_directory().await),
        ];
        if self.disk_usage_threshold > 0.0 {
            jobs.push(("disk-usage", self.check_disk_usage().await));
        }

        let checked_at = self.clock.now();
        let mut details = BTreeMap::new();
        for (name, outcome) in jobs {
            let (status, error) = match outcome {
                Ok(()) => (STATUS_OK, None),
                Err(e) => {
                    tracing::warn!(job = name, error = %e, "Health job failed");
                    (STATUS_FAILED, Some(e))
                }
            };
            details.insert(
                name.to_string(),
                HealthDetail {
                    name: name.to_string(),
                    status: status.to_string(),
                    error,
                    checked_at,
                },
            );
        }

        HealthStatus {
            status: overall_status(&details).to_string(),
            details,
        }
    }

    async fn check_database(&self) -> Result<(), String> {
        sqlx::query("SELECT 1")
            .execute(self.db.pool())
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn check_upload_directory(&self) -> Result<(), String> {
        match tokio::fs::metadata(&self.upload_dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(format!("{} is not a directory", self.upload_dir.display())),
            Err(e) => Err(format!("{}: {}", self.upload_dir.display(), e)),
        }
    }

    async fn check_disk_usage(&self) -> Result<(), String> {
        let dir = tokio::fs::canonicalize(&self.upload_dir)
            .await
            .map_err(|e| format!("{}: {}", self.upload_dir.display(), e))?;
        let threshold = self.disk_usage_threshold;

        tokio::task::spawn_blocking(move || {
            let disks = Disks::new_with_refreshed_list();
            let mounts: Vec<MountUsage> = disks
                .iter()
                .map(|d| MountUsage {
                    mount_point: d.mount_point().to_path_buf(),
                    total: d.total_space(),
                    available: d.available_space(),
                })
                .collect();

            let mount = find_mount(&dir, &mounts)
                .ok_or_else(|| format!("no disk is mounted for {}", dir.display()))?;
            check_usage(mount, threshold)
        })
        .await
        .map_err(|e| e.to_string())?
    }
}

#[derive(Debug, Clone)]
struct MountUsage {
    mount_point: PathBuf,
    total: u64,
    available: u64,
}

/// Deepest mount point containing `dir`
fn find_mount<'a>(dir: &Path, mounts: &'a [MountUsage]) -> Option<&'a MountUsage> {
    mounts
        .iter()
        .filter(|m| dir.starts_with(&m.mount_point))
        .max_by_key(|m| m.mount_point.components().count())
}

fn check_usage(mount: &MountUsage, threshold: f64) -> Result<(), String> {
    if mount.total == 0 {
        return Err(format!("{} reports no capacity", mount.mount_point.display()));
    }

    let used = mount.total.saturating_sub(mount.available) as f64;
    let usage = used / mount.total as f64 * 100.0;
    if usage >= threshold {
        return Err(format!(
            "{} is {:.1}% full, threshold {:.1}%",
            mount.mount_point.display(),
            usage,
            threshold
        ));
    }

    Ok(())
}

fn overall_status(details: &BTreeMap<String, HealthDetail>) -> &'static str {
    let failed = details
        .values()
        .filter(|d| d.status != STATUS_OK)
        .count();

    match failed {
        0 => STATUS_OK,
        n if n == details.len() => STATUS_FAILED,
        _ => STATUS_WARNING,
    }
}
