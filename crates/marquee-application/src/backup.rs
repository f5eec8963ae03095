// SPDX-License-Identifier: GPL-3.0-or-later
//! Database backups written with `VACUUM INTO`, one folder per backup type.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use marquee_domain::{Backup, BackupType};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

const PREFIX: &str = "marquee_backup_";
const EXTENSION: &str = ".db";
const TIME_FORMAT: &str = "%Y.%m.%d_%H.%M.%S";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("invalid backup name: {0}")]
    InvalidName(String),
    #[error("backup {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct BackupService {
    pool: SqlitePool,
    folder: PathBuf,
}

impl BackupService {
    pub fn new(pool: SqlitePool, folder: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn type_folder(&self, backup_type: BackupType) -> PathBuf {
        self.folder.join(backup_type.as_str())
    }

    /// Backup time from the file name, falling back to the file's mtime.
    fn backup_time(name: &str, modified: Option<std::time::SystemTime>) -> DateTime<Utc> {
        name.strip_prefix(PREFIX)
            .and_then(|rest| rest.strip_suffix(EXTENSION))
            .and_then(|stamp| NaiveDateTime::parse_from_str(stamp, TIME_FORMAT).ok())
            .map(|naive| naive.and_utc())
            .or_else(|| modified.map(DateTime::<Utc>::from))
            .unwrap_or_else(Utc::now)
    }

    /// Every backup across type folders, newest first.
    pub async fn list(&self) -> Result<Vec<Backup>, BackupError> {
        let mut backups = Vec::new();
        for backup_type in BackupType::ALL {
            let folder = self.type_folder(backup_type);
            if !fs::try_exists(&folder).await? {
                continue;
            }
            let mut entries = fs::read_dir(&folder).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !name.starts_with(PREFIX) || !name.ends_with(EXTENSION) {
                    continue;
                }
                let metadata = entry.metadata().await?;
                if !metadata.is_file() {
                    continue;
                }
                backups.push(Backup {
                    time: Self::backup_time(&name, metadata.modified().ok()),
                    path: entry.path().to_string_lossy().into_owned(),
                    name,
                    backup_type,
                    size: metadata.len(),
                });
            }
        }
        backups.sort_by(|a, b| b.time.cmp(&a.time).then_with(|| b.name.cmp(&a.name)));
        Ok(backups)
    }

    pub async fn create(&self, backup_type: BackupType) -> Result<Backup, BackupError> {
        let folder = self.type_folder(backup_type);
        fs::create_dir_all(&folder).await?;

        let now = Utc::now();
        let name = format!("{PREFIX}{}{EXTENSION}", now.format(TIME_FORMAT));
        let path = folder.join(&name);
        if fs::try_exists(&path).await? {
            fs::remove_file(&path).await?;
        }

        info!(target: "backup", %backup_type, path = %path.display(), "creating backup");
        sqlx::query("VACUUM INTO ?")
            .bind(path.to_string_lossy().into_owned())
            .execute(&self.pool)
            .await?;

        let size = fs::metadata(&path).await?.len();
        debug!(target: "backup", %name, size, "backup written");
        Ok(Backup {
            name,
            path: path.to_string_lossy().into_owned(),
            backup_type,
            size,
            time: now,
        })
    }

    pub async fn delete(&self, name: &str) -> Result<(), BackupError> {
        if name.contains(['/', '\\']) || name.contains("..") || !name.starts_with(PREFIX) {
            return Err(BackupError::InvalidName(name.to_string()));
        }
        let backup = self
            .list()
            .await?
            .into_iter()
            .find(|b| b.name == name)
            .ok_or_else(|| BackupError::NotFound(name.to_string()))?;
        fs::remove_file(&backup.path).await?;
        info!(target: "backup", %name, "backup deleted");
        Ok(())
    }

    /// Removes scheduled backups older than `retention_days`; returns how many.
    pub async fn cleanup(&self, retention_days: i64) -> Result<usize, BackupError> {
        if retention_days <= 0 {
            warn!(target: "backup", retention_days, "backup retention disabled");
            return Ok(0);
        }
        let cutoff =
            Duration::try_days(retention_days).and_then(|age| Utc::now().checked_sub_signed(age));
        let Some(cutoff) = cutoff else {
            warn!(target: "backup", retention_days, "backup retention longer than any backup can be old");
            return Ok(0);
        };
        let mut removed = 0;
        for backup in self.list().await? {
            if backup.backup_type == BackupType::Scheduled && backup.time < cutoff {
                fs::remove_file(&backup.path).await?;
                debug!(target: "backup", name = %backup.name, "removed expired backup");
                removed += 1;
            }
        }
        info!(target: "backup", removed, retention_days, "backup cleanup finished");
        Ok(removed)
    }
}
