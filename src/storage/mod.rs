//! Storage gateway
//!
//! [`StorageBackend`] is the capability interface over the bucket every
//! client prefix lives in: raw object primitives keyed by full object key,
//! plus read/write of the bucket's topic notification rules. The AWS S3
//! adapter is the only production implementation; tests substitute an
//! in-memory one.
//!
//! [`TenantStorage`] layers the client-prefix semantics on top (stripped
//! listings, local file transfer, existence-checked deletes).

mod aws;
#[cfg(test)]
pub(crate) mod memory;
mod tenant;

use async_trait::async_trait;
use aws_config::SdkConfig;
use bytes::Bytes;
use std::sync::Arc;

use crate::config::AwsConfig;
use crate::errors::Result;

pub use aws::AwsBackend;
pub use tenant::TenantStorage;

/// Event name matching every object-created flavour
pub const OBJECT_CREATED_EVENT: &str = "s3:ObjectCreated:*";

/// Key filter rule attached to a notification (`Prefix` or `Suffix`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    pub name: String,
    pub value: String,
}

/// One topic notification entry of the bucket configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRule {
    /// Rules written by other tools may carry no id
    pub id: Option<String>,
    pub topic_arn: String,
    pub events: Vec<String>,
    pub filter_rules: Vec<FilterRule>,
}

impl TopicRule {
    /// Publish to `topic_arn` whenever an object is created under `prefix`
    pub fn object_created(id: String, topic_arn: String, prefix: String) -> Self {
        Self {
            id: Some(id),
            topic_arn,
            events: vec![OBJECT_CREATED_EVENT.to_string()],
            filter_rules: vec![FilterRule {
                name: "Prefix".to_string(),
                value: prefix,
            }],
        }
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }
}

/// Storage backend trait for bucket-level operations
///
/// Keys are full object keys within the bucket. None of these calls retry;
/// transport-level retry belongs to the SDK.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Get an object's content
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Put an object, always requesting server-side encryption
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Delete an object. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List every key starting with `prefix`, in provider order
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Read the full list of topic notification rules
    async fn topic_rules(&self) -> Result<Vec<TopicRule>>;

    /// Replace the full list of topic notification rules
    async fn set_topic_rules(&self, rules: Vec<TopicRule>) -> Result<()>;
}

/// Create the storage backend for `bucket` from the shared SDK config
pub fn create_backend(
    sdk_config: &SdkConfig,
    config: &AwsConfig,
    bucket: &str,
) -> Arc<dyn StorageBackend> {
    Arc::new(AwsBackend::new(sdk_config, config, bucket))
}
