//! AWS identity backend implementation
//!
//! Users, groups and access keys go through IAM; the calling credential is
//! identified through STS GetCallerIdentity, which works for any credential
//! without extra IAM permissions.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_iam::error::{DisplayErrorContext, ProvideErrorMetadata};
use tracing::{debug, info};

use crate::errors::{Result, SchedLoadError};
use crate::identity::{parse_identity_arn, AccountDetails, Credentials, IdentityBackend};

/// IAM + STS identity backend
pub struct AwsIdentity {
    iam: aws_sdk_iam::Client,
    sts: aws_sdk_sts::Client,
}

impl AwsIdentity {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            iam: aws_sdk_iam::Client::new(sdk_config),
            sts: aws_sdk_sts::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl IdentityBackend for AwsIdentity {
    async fn user_exists(&self, user: &str) -> Result<bool> {
        match self.iam.get_user().user_name(user).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                if let Some(service_err) = err.as_service_error() {
                    if service_err.is_no_such_entity_exception()
                        || service_err.code() == Some("AccessDenied")
                    {
                        debug!(user, code = ?service_err.code(), "Treating user as absent");
                        return Ok(false);
                    }
                }
                Err(SchedLoadError::identity("GetUser", DisplayErrorContext(err)))
            }
        }
    }

    async fn create_user(&self, user: &str, path: &str) -> Result<()> {
        self.iam
            .create_user()
            .user_name(user)
            .path(path)
            .send()
            .await
            .map_err(|e| SchedLoadError::identity("CreateUser", DisplayErrorContext(e)))?;
        info!(user, path, "Created user");
        Ok(())
    }

    async fn delete_user(&self, user: &str) -> Result<()> {
        self.iam
            .delete_user()
            .user_name(user)
            .send()
            .await
            .map_err(|e| SchedLoadError::identity("DeleteUser", DisplayErrorContext(e)))?;
        info!(user, "Deleted user");
        Ok(())
    }

    async fn add_user_to_group(&self, user: &str, group: &str) -> Result<()> {
        self.iam
            .add_user_to_group()
            .group_name(group)
            .user_name(user)
            .send()
            .await
            .map_err(|e| SchedLoadError::identity("AddUserToGroup", DisplayErrorContext(e)))?;
        Ok(())
    }

    async fn remove_user_from_group(&self, user: &str, group: &str) -> Result<()> {
        self.iam
            .remove_user_from_group()
            .group_name(group)
            .user_name(user)
            .send()
            .await
            .map_err(|e| {
                SchedLoadError::identity("RemoveUserFromGroup", DisplayErrorContext(e))
            })?;
        Ok(())
    }

    async fn is_user_in_group(&self, user: &str, group: &str) -> Result<bool> {
        let resp = self
            .iam
            .list_groups_for_user()
            .user_name(user)
            .send()
            .await
            .map_err(|e| SchedLoadError::identity("ListGroupsForUser", DisplayErrorContext(e)))?;

        Ok(resp.groups().iter().any(|g| g.group_name() == group))
    }

    async fn create_access_key(&self, user: &str) -> Result<Credentials> {
        let resp = self
            .iam
            .create_access_key()
            .user_name(user)
            .send()
            .await
            .map_err(|e| SchedLoadError::identity("CreateAccessKey", DisplayErrorContext(e)))?;

        let key = resp.access_key().ok_or_else(|| {
            SchedLoadError::identity("CreateAccessKey", "response carried no access key")
        })?;
        info!(user, access_key_id = key.access_key_id(), "Issued access key");
        Ok(Credentials {
            access_key_id: key.access_key_id().to_string(),
            secret_access_key: key.secret_access_key().to_string(),
        })
    }

    async fn list_access_key_ids(&self, user: &str) -> Result<Vec<String>> {
        let resp = self
            .iam
            .list_access_keys()
            .user_name(user)
            .send()
            .await
            .map_err(|e| SchedLoadError::identity("ListAccessKeys", DisplayErrorContext(e)))?;

        Ok(resp
            .access_key_metadata()
            .iter()
            .filter_map(|metadata| metadata.access_key_id().map(str::to_string))
            .collect())
    }

    async fn delete_access_key(&self, user: &str, key_id: &str) -> Result<()> {
        self.iam
            .delete_access_key()
            .access_key_id(key_id)
            .user_name(user)
            .send()
            .await
            .map_err(|e| SchedLoadError::identity("DeleteAccessKey", DisplayErrorContext(e)))?;
        info!(user, access_key_id = key_id, "Revoked access key");
        Ok(())
    }

    async fn caller_identity(&self) -> Result<AccountDetails> {
        let resp = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| {
                SchedLoadError::identity(
                    "GetCallerIdentity",
                    aws_sdk_sts::error::DisplayErrorContext(e),
                )
            })?;

        let arn = resp.arn().ok_or_else(|| {
            SchedLoadError::identity("GetCallerIdentity", "response carried no ARN")
        })?;
        debug!(arn, "Resolved caller identity");
        parse_identity_arn(arn)
    }
}
