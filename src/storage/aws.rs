//! AWS S3 storage backend implementation
//!
//! Uses aws_sdk_s3::Client built from the shared SDK config, so credentials
//! come from the default AWS credential chain:
//! - Environment variables (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY)
//! - Shared credentials/config files
//! - EC2 instance metadata / ECS task role
//!
//! A custom endpoint (MinIO and other S3-compatible stores) switches the
//! client to path-style addressing.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    Event, FilterRule as SdkFilterRule, FilterRuleName, NotificationConfiguration,
    NotificationConfigurationFilter, S3KeyFilter, ServerSideEncryption, TopicConfiguration,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use crate::config::AwsConfig;
use crate::errors::{Result, SchedLoadError};
use crate::storage::{FilterRule, StorageBackend, TopicRule};

/// AWS S3 storage backend
pub struct AwsBackend {
    client: Client,
    bucket: String,
}

impl AwsBackend {
    /// Create a new AWS S3 backend for `bucket`
    pub fn new(sdk_config: &SdkConfig, config: &AwsConfig, bucket: &str) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);

        // Configure endpoint (for S3-compatible services like MinIO)
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
        }
    }

    async fn notification_configuration(
        &self,
    ) -> Result<aws_sdk_s3::operation::get_bucket_notification_configuration::GetBucketNotificationConfigurationOutput>
    {
        self.client
            .get_bucket_notification_configuration()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                SchedLoadError::storage("GetBucketNotificationConfiguration", DisplayErrorContext(e))
            })
    }
}

#[async_trait]
impl StorageBackend for AwsBackend {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| SchedLoadError::storage("GetObject", DisplayErrorContext(e)))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| SchedLoadError::storage("GetObject", e))?;
        Ok(data.into_bytes())
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        debug!(bucket = %self.bucket, key, size = data.len(), "PutObject");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .server_side_encryption(ServerSideEncryption::Aes256)
            .send()
            .await
            .map_err(|e| SchedLoadError::storage("PutObject", DisplayErrorContext(e)))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        debug!(bucket = %self.bucket, key, "DeleteObject");
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| SchedLoadError::storage("DeleteObject", DisplayErrorContext(e)))?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = vec![];
        let mut continuation_token: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| SchedLoadError::storage("ListObjectsV2", DisplayErrorContext(e)))?;

            keys.extend(
                resp.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match resp.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(bucket = %self.bucket, prefix, count = keys.len(), "ListObjectsV2");
        Ok(keys)
    }

    async fn topic_rules(&self) -> Result<Vec<TopicRule>> {
        let current = self.notification_configuration().await?;
        Ok(current
            .topic_configurations()
            .iter()
            .map(from_sdk_rule)
            .collect())
    }

    async fn set_topic_rules(&self, rules: Vec<TopicRule>) -> Result<()> {
        // The provider only accepts the whole configuration; queue, lambda and
        // event bridge entries are carried over from what is there now.
        let current = self.notification_configuration().await?;

        let topics = rules
            .into_iter()
            .map(to_sdk_rule)
            .collect::<Result<Vec<_>>>()?;

        let configuration = NotificationConfiguration::builder()
            .set_topic_configurations(Some(topics))
            .set_queue_configurations(current.queue_configurations)
            .set_lambda_function_configurations(current.lambda_function_configurations)
            .set_event_bridge_configuration(current.event_bridge_configuration)
            .build();

        self.client
            .put_bucket_notification_configuration()
            .bucket(&self.bucket)
            .notification_configuration(configuration)
            .send()
            .await
            .map_err(|e| {
                SchedLoadError::storage("PutBucketNotificationConfiguration", DisplayErrorContext(e))
            })?;
        Ok(())
    }
}

fn from_sdk_rule(configuration: &TopicConfiguration) -> TopicRule {
    let filter_rules = configuration
        .filter()
        .and_then(|filter| filter.key())
        .map(|key| key.filter_rules())
        .unwrap_or_default()
        .iter()
        .filter_map(|rule| {
            Some(FilterRule {
                name: rule.name()?.as_str().to_string(),
                value: rule.value()?.to_string(),
            })
        })
        .collect();

    TopicRule {
        id: configuration.id().map(str::to_string),
        topic_arn: configuration.topic_arn().to_string(),
        events: configuration
            .events()
            .iter()
            .map(|event| event.as_str().to_string())
            .collect(),
        filter_rules,
    }
}

fn to_sdk_rule(rule: TopicRule) -> Result<TopicConfiguration> {
    let filter = if rule.filter_rules.is_empty() {
        None
    } else {
        let key = S3KeyFilter::builder()
            .set_filter_rules(Some(
                rule.filter_rules
                    .into_iter()
                    .map(|r| {
                        SdkFilterRule::builder()
                            .name(FilterRuleName::from(r.name.as_str()))
                            .value(r.value)
                            .build()
                    })
                    .collect(),
            ))
            .build();
        Some(NotificationConfigurationFilter::builder().key(key).build())
    };

    TopicConfiguration::builder()
        .set_id(rule.id)
        .topic_arn(rule.topic_arn)
        .set_events(Some(
            rule.events
                .iter()
                .map(|event| Event::from(event.as_str()))
                .collect(),
        ))
        .set_filter(filter)
        .build()
        .map_err(|e| SchedLoadError::storage("PutBucketNotificationConfiguration", e))
}
