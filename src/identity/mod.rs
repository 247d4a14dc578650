//! Identity gateway
//!
//! [`IdentityBackend`] is the capability interface over the user directory:
//! users, group membership, access keys, and the identity of the calling
//! credential. [`AwsIdentity`] maps it onto IAM and STS.

mod aws;
#[cfg(test)]
pub(crate) mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::SdkConfig;
use serde::Serialize;

use crate::errors::{Result, SchedLoadError};

pub use aws::AwsIdentity;

/// Reserved first path segment for integrator users
const INTEGRATOR_PATH: &str = "integrator";

/// Which kind of credential is making the calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Integrator,
    Client,
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionType::Integrator => write!(f, "integrator"),
            ConnectionType::Client => write!(f, "client"),
        }
    }
}

/// Identity of the calling credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountDetails {
    pub account_id: String,
    pub integrator_id: String,
    pub client_id: Option<String>,
    pub connection_type: ConnectionType,
}

/// Access key pair issued for a client user. Handed to the caller once and
/// not kept anywhere.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AccessKeyId: {}, SecretAccessKey: {}",
            self.access_key_id, self.secret_access_key
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Parse a user ARN such as `arn:aws:iam::123456789012:user/integrator/acme`.
///
/// The resource must be `user/` plus exactly two path segments:
/// `user/integrator/<IntegratorId>` for integrators and
/// `user/<IntegratorId>/<ClientId>` for client users.
pub fn parse_identity_arn(arn: &str) -> Result<AccountDetails> {
    // arn:partition:service:region:account:resource, region is empty for IAM
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    if parts.len() != 6 || parts[0] != "arn" || parts[4].is_empty() {
        return Err(SchedLoadError::UnexpectedIdentityPath(arn.to_string()));
    }
    let account_id = parts[4].to_string();
    let resource = parts[5];

    let segments: Vec<&str> = resource.split('/').collect();
    if segments.len() != 3 || segments[0] != "user" || segments.iter().any(|s| s.is_empty()) {
        return Err(SchedLoadError::UnexpectedIdentityPath(resource.to_string()));
    }

    let details = if segments[1] == INTEGRATOR_PATH {
        AccountDetails {
            account_id,
            integrator_id: segments[2].to_string(),
            client_id: None,
            connection_type: ConnectionType::Integrator,
        }
    } else {
        AccountDetails {
            account_id,
            integrator_id: segments[1].to_string(),
            client_id: Some(segments[2].to_string()),
            connection_type: ConnectionType::Client,
        }
    };
    Ok(details)
}

/// Identity backend trait for user directory operations
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Whether the user exists. A refusal to look is reported as absence:
    /// limited callers cannot tell "absent" from "forbidden".
    async fn user_exists(&self, user: &str) -> Result<bool>;

    async fn create_user(&self, user: &str, path: &str) -> Result<()>;

    async fn delete_user(&self, user: &str) -> Result<()>;

    async fn add_user_to_group(&self, user: &str, group: &str) -> Result<()>;

    async fn remove_user_from_group(&self, user: &str, group: &str) -> Result<()>;

    async fn is_user_in_group(&self, user: &str, group: &str) -> Result<bool>;

    async fn create_access_key(&self, user: &str) -> Result<Credentials>;

    async fn list_access_key_ids(&self, user: &str) -> Result<Vec<String>>;

    async fn delete_access_key(&self, user: &str, key_id: &str) -> Result<()>;

    /// Identity of the credential this backend calls with
    async fn caller_identity(&self) -> Result<AccountDetails>;
}

/// Create the identity backend from the shared SDK config
pub fn create_backend(sdk_config: &SdkConfig) -> Arc<dyn IdentityBackend> {
    Arc::new(AwsIdentity::new(sdk_config))
}
