//! Schedule and data file operations for one client
//!
//! Data files live under `INPUT/` in the client prefix. A schedule is a
//! zero-byte marker object `<INTERVAL>_SCHEDULE`; its presence is the whole
//! setting.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::errors::{Result, SchedLoadError};
use crate::storage::TenantStorage;
use crate::tenant::INPUT_PREFIX;

/// Collection interval a schedule marker can announce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleInterval {
    Daily,
}

impl ScheduleInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleInterval::Daily => "DAILY",
        }
    }

    pub fn marker_key(&self) -> String {
        format!("{}_SCHEDULE", self.as_str())
    }
}

/// Schedule state as reported to the user. `Error` stands for a listing
/// failure; the three words are what the command prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScheduleStatus {
    Daily,
    None,
    Error,
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleStatus::Daily => write!(f, "DAILY"),
            ScheduleStatus::None => write!(f, "NONE"),
            ScheduleStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Keep keys under `INPUT/`, dropping the bare prefix itself, in listing order
pub fn data_files(keys: Vec<String>) -> Vec<String> {
    keys.into_iter()
        .filter(|key| key.starts_with(INPUT_PREFIX) && key.len() > INPUT_PREFIX.len())
        .collect()
}

pub struct FileFacade {
    storage: TenantStorage,
}

impl FileFacade {
    pub fn new(storage: TenantStorage) -> Self {
        Self { storage }
    }

    /// Write the interval's marker. True when the store echoed the marker key.
    pub async fn set_schedule(&self, interval: ScheduleInterval) -> Result<bool> {
        let target = interval.marker_key();
        let marker = tempfile::NamedTempFile::new()?;
        let written = self.storage.put_object(marker.path(), &target).await?;
        info!(client_id = %self.storage.tenant().client_id, schedule = interval.as_str(), "Schedule set");
        Ok(written == target)
    }

    pub async fn get_schedule(&self) -> ScheduleStatus {
        match self.storage.list_object_keys().await {
            Ok(keys) => {
                let daily = ScheduleInterval::Daily.marker_key();
                if keys.iter().any(|key| *key == daily) {
                    ScheduleStatus::Daily
                } else {
                    ScheduleStatus::None
                }
            }
            Err(e) => {
                error!(error = %e, "Listing failed while reading schedule");
                ScheduleStatus::Error
            }
        }
    }

    /// Remove the daily marker, returning whether it was there
    pub async fn remove_schedule(&self) -> Result<bool> {
        self.storage
            .delete_object(&ScheduleInterval::Daily.marker_key())
            .await
    }

    pub async fn list_data_files(&self) -> Result<Vec<String>> {
        Ok(data_files(self.storage.list_object_keys().await?))
    }

    /// Upload to `INPUT/<file name>` and confirm the key shows up in a fresh
    /// listing; a write the store does not list yet counts as failed.
    pub async fn upload_data_file(&self, local_path: &Path) -> Result<String> {
        let name = local_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| SchedLoadError::InvalidFileName(local_path.display().to_string()))?;
        let target = format!("{}{}", INPUT_PREFIX, name);

        let uploaded = self.storage.put_object(local_path, &target).await?;
        let keys = self.storage.list_object_keys().await?;
        if !keys.contains(&uploaded) {
            return Err(SchedLoadError::UploadVerificationFailed(uploaded));
        }
        Ok(uploaded)
    }

    pub async fn delete_data_file(&self, remote_key: &str) -> Result<bool> {
        self.storage.delete_object(remote_key).await
    }

    pub async fn download_data_file(&self, remote_key: &str, local_dir: &Path) -> Result<PathBuf> {
        self.storage.get_object(remote_key, local_dir).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;
    use crate::tenant::fixture;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    fn facade_with(keys: &[&str]) -> (Arc<MemoryStorage>, FileFacade) {
        let backend = Arc::new(MemoryStorage::with_objects(keys));
        let facade = FileFacade::new(TenantStorage::new(backend.clone(), fixture()));
        (backend, facade)
    }

    #[test]
    fn test_data_files_filter() {
        let keys = ["somefile", "INPUT/thefile", "INPUT/otherfile", "PROCESSED/anotherone"]
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(data_files(keys), vec!["INPUT/thefile", "INPUT/otherfile"]);
    }

    #[test]
    fn test_data_files_skips_bare_prefix() {
        let keys = vec!["INPUT/".to_string(), "INPUT".to_string(), "INPUT/x".to_string()];
        assert_eq!(data_files(keys), vec!["INPUT/x"]);
    }

    #[test]
    fn test_schedule_words() {
        assert_eq!(ScheduleInterval::Daily.marker_key(), "DAILY_SCHEDULE");
        assert_eq!(ScheduleStatus::Daily.to_string(), "DAILY");
        assert_eq!(ScheduleStatus::None.to_string(), "NONE");
        assert_eq!(ScheduleStatus::Error.to_string(), "ERROR");
        assert_eq!(
            serde_json::to_value(ScheduleStatus::None).unwrap(),
            serde_json::json!("NONE")
        );
    }

    #[tokio::test]
    async fn test_schedule_status() {
        let (_, facade) = facade_with(&["acme/INPUT/a.csv", "acme/DAILY_SCHEDULE"]);
        assert_eq!(facade.get_schedule().await, ScheduleStatus::Daily);

        let (_, facade) = facade_with(&["acme/INPUT/a.csv", "globex/DAILY_SCHEDULE"]);
        assert_eq!(facade.get_schedule().await, ScheduleStatus::None);

        let (backend, facade) = facade_with(&["acme/DAILY_SCHEDULE"]);
        backend.fail_list();
        assert_eq!(facade.get_schedule().await, ScheduleStatus::Error);
    }

    #[tokio::test]
    async fn test_set_and_remove_schedule() {
        let (backend, facade) = facade_with(&[]);

        assert!(assert_ok!(facade.set_schedule(ScheduleInterval::Daily).await));
        assert_eq!(backend.object("acme/DAILY_SCHEDULE"), Some(vec![]));
        assert_eq!(facade.get_schedule().await, ScheduleStatus::Daily);

        assert!(assert_ok!(facade.remove_schedule().await));
        assert_eq!(facade.get_schedule().await, ScheduleStatus::None);
        assert!(!assert_ok!(facade.remove_schedule().await));
    }

    #[tokio::test]
    async fn test_upload_then_list() {
        let (_, facade) = facade_with(&["acme/INPUT/older.csv"]);
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("test-file.csv");
        std::fs::write(&local, b"id,value\n1,2\n").unwrap();

        let key = assert_ok!(facade.upload_data_file(&local).await);
        assert_eq!(key, "INPUT/test-file.csv");

        let files = assert_ok!(facade.list_data_files().await);
        assert_eq!(files, vec!["INPUT/older.csv", "INPUT/test-file.csv"]);
    }

    #[tokio::test]
    async fn test_upload_not_visible_fails_verification() {
        let (backend, facade) = facade_with(&[]);
        backend.drop_puts();
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("report.csv");
        std::fs::write(&local, b"x").unwrap();

        let err = assert_err!(facade.upload_data_file(&local).await);
        assert!(matches!(
            err,
            SchedLoadError::UploadVerificationFailed(ref key) if key == "INPUT/report.csv"
        ));
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let (backend, facade) = facade_with(&[]);
        let err = assert_err!(
            facade
                .upload_data_file(Path::new("/no/such/dir/report.csv"))
                .await
        );
        assert!(matches!(err, SchedLoadError::Io(_)));
        assert!(backend.keys().is_empty());
    }

    #[tokio::test]
    async fn test_upload_path_without_file_name() {
        let (backend, facade) = facade_with(&[]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("..");

        let err = assert_err!(facade.upload_data_file(&path).await);
        assert!(matches!(err, SchedLoadError::InvalidFileName(_)));
        assert!(backend.keys().is_empty());
    }

    #[tokio::test]
    async fn test_delete_data_file() {
        let (_, facade) = facade_with(&["acme/INPUT/report.csv"]);

        assert!(assert_ok!(facade.delete_data_file("INPUT/report.csv").await));
        assert!(assert_ok!(facade.list_data_files().await).is_empty());
        assert!(!assert_ok!(facade.delete_data_file("INPUT/report.csv").await));
    }

    #[tokio::test]
    async fn test_download_data_file() {
        let (backend, facade) = facade_with(&[]);
        backend.insert("acme/INPUT/report.csv", b"a,b");
        let dir = tempfile::tempdir().unwrap();

        let path = assert_ok!(
            facade
                .download_data_file("INPUT/report.csv", dir.path())
                .await
        );
        assert_eq!(std::fs::read(path).unwrap(), b"a,b");
    }
}
