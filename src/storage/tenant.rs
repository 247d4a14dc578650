//! Client-prefixed file operations on top of a [`StorageBackend`]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use crate::errors::{Result, SchedLoadError};
use crate::storage::{StorageBackend, TopicRule};
use crate::tenant::Tenant;

/// File operations scoped to one client's key prefix. Every key going in or
/// coming out is relative to `<ClientId>/`.
#[derive(Clone)]
pub struct TenantStorage {
    backend: Arc<dyn StorageBackend>,
    tenant: Tenant,
}

impl TenantStorage {
    pub fn new(backend: Arc<dyn StorageBackend>, tenant: Tenant) -> Self {
        Self { backend, tenant }
    }

    pub fn tenant(&self) -> &Tenant {
        &self.tenant
    }

    /// List the client's keys with the client prefix stripped
    pub async fn list_object_keys(&self) -> Result<Vec<String>> {
        let prefix = self.tenant.key_prefix();
        let keys = self.backend.list(&prefix).await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    /// Upload a local file to `remote_key`, returning the key written
    pub async fn put_object(&self, local_path: &Path, remote_key: &str) -> Result<String> {
        let data = tokio::fs::read(local_path).await?;
        self.backend
            .put(&self.tenant.object_key(remote_key), Bytes::from(data))
            .await?;
        info!(
            client_id = %self.tenant.client_id,
            local = %local_path.display(),
            key = remote_key,
            "File uploaded"
        );
        Ok(remote_key.to_string())
    }

    /// Download `remote_key` into `local_dir`, named after the key's basename.
    /// The directory is created when missing and an existing file is replaced.
    /// Keys whose basename is empty, `.` or `..` are refused.
    pub async fn get_object(&self, remote_key: &str, local_dir: &Path) -> Result<PathBuf> {
        let name = remote_key.rsplit('/').next().unwrap_or(remote_key);
        if matches!(name, "" | "." | "..") {
            return Err(SchedLoadError::InvalidFileName(remote_key.to_string()));
        }
        let local_path = local_dir.join(name);

        let data = self.backend.get(&self.tenant.object_key(remote_key)).await?;

        tokio::fs::create_dir_all(local_dir).await?;
        tokio::fs::write(&local_path, &data).await?;
        info!(
            key = remote_key,
            local = %local_path.display(),
            size = data.len(),
            "File downloaded"
        );
        Ok(local_path)
    }

    /// Delete `remote_key`, reporting whether it existed.
    ///
    /// The provider's delete succeeds for absent keys, so existence is
    /// established from a listing first.
    pub async fn delete_object(&self, remote_key: &str) -> Result<bool> {
        let keys = self.list_object_keys().await?;
        if !keys.iter().any(|key| key == remote_key) {
            warn!(client_id = %self.tenant.client_id, key = remote_key, "File not found for deletion");
            return Ok(false);
        }

        self.backend
            .delete(&self.tenant.object_key(remote_key))
            .await?;
        info!(client_id = %self.tenant.client_id, key = remote_key, "File deleted");
        Ok(true)
    }

    /// Delete every object under the client prefix, returning how many went
    pub async fn purge(&self) -> Result<usize> {
        let keys = self.list_object_keys().await?;
        for key in &keys {
            self.backend.delete(&self.tenant.object_key(key)).await?;
        }
        info!(client_id = %self.tenant.client_id, count = keys.len(), "Purged client files");
        Ok(keys.len())
    }

    /// Bucket-wide notification rules; always the full list
    pub async fn get_notification_config(&self) -> Result<Vec<TopicRule>> {
        self.backend.topic_rules().await
    }

    pub async fn put_notification_config(&self, rules: Vec<TopicRule>) -> Result<()> {
        self.backend.set_topic_rules(rules).await
    }
}
