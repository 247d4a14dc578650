//! Upload notification reconciler
//!
//! Each client owns at most one topic rule in the shared bucket's
//! notification configuration, identified by
//! `S3ObjectCreatedSNS-<IntegratorId>-<ClientId>`. Every operation reads the
//! full rule list right before acting on it and writes the full list back.
//! The provider offers no conditional write, so a concurrent writer between
//! our read and our write loses (last write wins).

use tracing::info;

use crate::errors::Result;
use crate::storage::{TenantStorage, TopicRule};

pub struct NotificationReconciler {
    storage: TenantStorage,
}

impl NotificationReconciler {
    pub fn new(storage: TenantStorage) -> Self {
        Self { storage }
    }

    pub async fn has_notification(&self) -> Result<bool> {
        let id = self.storage.tenant().notification_id();
        let rules = self.storage.get_notification_config().await?;
        let is_set = rules.iter().any(|rule| rule.has_id(&id));
        info!(client_id = %self.storage.tenant().client_id, is_set, "Checked upload notification");
        Ok(is_set)
    }

    /// Add the client's rule, returning false if it was already there
    pub async fn add_notification(&self) -> Result<bool> {
        let tenant = self.storage.tenant();
        let id = tenant.notification_id();
        let mut rules = self.storage.get_notification_config().await?;

        if rules.iter().any(|rule| rule.has_id(&id)) {
            info!(client_id = %tenant.client_id, "Upload notification already configured");
            return Ok(false);
        }

        rules.push(TopicRule::object_created(
            id,
            tenant.topic_arn(),
            tenant.notification_prefix(),
        ));
        self.storage.put_notification_config(rules).await?;
        info!(client_id = %tenant.client_id, "Upload notification added");
        Ok(true)
    }

    /// Remove the client's rule, returning false if there was none.
    /// The order of the remaining rules is not preserved.
    pub async fn remove_notification(&self) -> Result<bool> {
        let tenant = self.storage.tenant();
        let id = tenant.notification_id();
        let mut rules = self.storage.get_notification_config().await?;

        let Some(index) = rules.iter().position(|rule| rule.has_id(&id)) else {
            info!(client_id = %tenant.client_id, "Upload notification not found for removal");
            return Ok(false);
        };

        rules.swap_remove(index);
        self.storage.put_notification_config(rules).await?;
        info!(client_id = %tenant.client_id, "Upload notification removed");
        Ok(true)
    }
}
