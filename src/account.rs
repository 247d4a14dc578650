//! Account lifecycle
//!
//! Client accounts move `Absent -> Created -> Deleted`. Creation is a
//! three-step sequence against the identity directory; deletion tolerates
//! every partial state a previous run or a manual cleanup can leave behind
//! (user without group, user without keys, no user at all).
//!
//! Neither direction rolls back: the first failing step aborts the rest
//! and its error is returned as is.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::errors::{Result, SchedLoadError};
use crate::identity::{AccountDetails, Credentials, IdentityBackend};
use crate::storage::TenantStorage;
use crate::tenant::Tenant;

/// Fetch the calling credential's identity, rejecting a configured client id
/// that disagrees with the one the credential belongs to.
pub async fn resolve_identity(
    identity: &dyn IdentityBackend,
    configured_client: Option<&str>,
) -> Result<AccountDetails> {
    let details = identity.caller_identity().await?;
    if let (Some(given), Some(resolved)) = (configured_client, details.client_id.as_deref()) {
        if given != resolved {
            return Err(SchedLoadError::ClientIdMismatch {
                given: given.to_string(),
                resolved: resolved.to_string(),
            });
        }
    }
    Ok(details)
}

/// Build the tenant for a client-scoped command.
///
/// Integrator and account ids come from the credential unless both are
/// configured; the client id comes from configuration or, for client
/// credentials, from the credential itself.
pub async fn resolve_tenant(identity: &dyn IdentityBackend, config: &Config) -> Result<Tenant> {
    let configured = &config.tenant;
    let mut client_id = configured.client_id.clone();

    let (account_id, integrator_id) =
        match (&configured.account_id, &configured.integrator_id) {
            (Some(account_id), Some(integrator_id)) => (account_id.clone(), integrator_id.clone()),
            _ => {
                let details = resolve_identity(identity, client_id.as_deref()).await?;
                if let Some(given) = configured.integrator_id.as_deref() {
                    if given != details.integrator_id {
                        warn!(
                            configured = given,
                            resolved = %details.integrator_id,
                            "Configured integrator id ignored in favour of the credential's"
                        );
                    }
                }
                if client_id.is_none() {
                    client_id = details.client_id;
                }
                (details.account_id, details.integrator_id)
            }
        };

    Ok(Tenant {
        region: config.aws.region.clone(),
        account_id,
        integrator_id,
        client_id: client_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(SchedLoadError::MissingClient)?,
    })
}

/// Creates and deletes client accounts for one tenant
pub struct AccountManager {
    identity: Arc<dyn IdentityBackend>,
    storage: TenantStorage,
}

impl AccountManager {
    pub fn new(identity: Arc<dyn IdentityBackend>, storage: TenantStorage) -> Self {
        Self { identity, storage }
    }

    fn tenant(&self) -> &Tenant {
        self.storage.tenant()
    }

    /// Create the directory user, put it in the integrator's client group and
    /// issue its single access key.
    pub async fn create_client_account(&self) -> Result<Credentials> {
        let tenant = self.tenant();
        let user = tenant.user_name();

        self.identity
            .create_user(user, &tenant.user_path())
            .await
            .inspect_err(|e| error!(client_id = user, error = %e, "Creating user failed"))?;

        self.identity
            .add_user_to_group(user, &tenant.client_group())
            .await
            .inspect_err(|e| {
                error!(client_id = user, error = %e, "Adding user to client group failed, user left in place")
            })?;

        let credentials = self
            .identity
            .create_access_key(user)
            .await
            .inspect_err(|e| {
                error!(client_id = user, error = %e, "Issuing access key failed, user left in place")
            })?;

        info!(client_id = user, integrator_id = %tenant.integrator_id, "Created client user account");
        Ok(credentials)
    }

    /// Delete the client account, returning whether the user existed.
    ///
    /// With `force`, every object under the client prefix is purged first,
    /// whether or not the user exists.
    pub async fn delete_client_account(&self, force: bool) -> Result<bool> {
        let tenant = self.tenant();
        let user = tenant.user_name();

        let existed = self.identity.user_exists(user).await?;

        if force {
            self.storage.purge().await?;
        }

        if !existed {
            info!(client_id = user, "Client user did not exist");
            return Ok(false);
        }

        let group = tenant.client_group();
        if self.identity.is_user_in_group(user, &group).await? {
            self.identity.remove_user_from_group(user, &group).await?;
        }

        // Keys must be gone before the directory accepts the user deletion
        for key_id in self.identity.list_access_key_ids(user).await? {
            self.identity.delete_access_key(user, &key_id).await?;
        }

        self.identity.delete_user(user).await?;
        info!(client_id = user, "Deleted client user account");
        Ok(true)
    }
}
