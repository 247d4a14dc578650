//! Configuration management for sched-load
//!
//! Supports configuration via:
//! - Optional TOML config file (lowest precedence)
//! - Environment variables
//! - Global command line flags (highest precedence)
//!
//! The result is an immutable [`Config`] built once per invocation and
//! passed explicitly to whatever needs it.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SchedLoadError};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Cloud provider connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Region for every provider call and for derived topic ARNs
    #[serde(default = "default_region")]
    pub region: String,

    /// Bucket holding all client prefixes (defaults to the integrator id)
    #[serde(default)]
    pub bucket: Option<String>,

    /// Custom S3 endpoint URL (for S3-compatible services)
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            bucket: None,
            endpoint: None,
        }
    }
}

/// Tenant ids supplied by the operator. Anything left unset is discovered
/// from the calling credential.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantConfig {
    #[serde(default)]
    pub integrator_id: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub account_id: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub aws: AwsConfig,

    #[serde(default)]
    pub tenant: TenantConfig,

    /// Log level (default: info)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aws: AwsConfig::default(),
            tenant: TenantConfig::default(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub region: Option<String>,
    pub integrator_id: Option<String>,
    pub client_id: Option<String>,
    pub bucket: Option<String>,
    pub endpoint: Option<String>,
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// Environment variables:
    /// - SCHED_LOAD_CONFIG_FILE: optional path to TOML config file
    /// - SCHED_LOAD_REGION: provider region (falls back to AWS_REGION)
    /// - SCHED_LOAD_INTEGRATOR: integrator id
    /// - SCHED_LOAD_CLIENT: client id
    /// - SCHED_LOAD_ACCOUNT_ID: cloud account id
    /// - SCHED_LOAD_BUCKET: bucket name (default: integrator id)
    /// - SCHED_LOAD_ENDPOINT: custom S3 endpoint URL
    /// - SCHED_LOAD_LOG_LEVEL: log level (default: info)
    /// - SCHED_LOAD_LOG_FORMAT: text|json (default: text)
    pub fn from_env(config_file: Option<&Path>) -> Result<Self> {
        let env_file = std::env::var("SCHED_LOAD_CONFIG_FILE").ok();
        let mut config = match (config_file, &env_file) {
            (Some(path), _) => Self::from_file(path)?,
            (None, Some(path)) => Self::from_file(Path::new(path))?,
            (None, None) => Self::default(),
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SchedLoadError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| SchedLoadError::Config(e.to_string()))?;
        config.tenant.client_id = config.tenant.client_id.and_then(normalise_client_id);
        Ok(config)
    }

    /// Overlay variables found by `lookup` on top of the current values
    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(region) = lookup("SCHED_LOAD_REGION").or_else(|| lookup("AWS_REGION")) {
            self.aws.region = region;
        }

        if let Some(integrator) = lookup("SCHED_LOAD_INTEGRATOR") {
            self.tenant.integrator_id = Some(integrator);
        }

        if let Some(client) = lookup("SCHED_LOAD_CLIENT") {
            self.tenant.client_id = normalise_client_id(client);
        }

        if let Some(account) = lookup("SCHED_LOAD_ACCOUNT_ID") {
            self.tenant.account_id = Some(account);
        }

        if let Some(bucket) = lookup("SCHED_LOAD_BUCKET") {
            self.aws.bucket = Some(bucket);
        }

        if let Some(endpoint) = lookup("SCHED_LOAD_ENDPOINT") {
            self.aws.endpoint = Some(endpoint);
        }

        if let Some(level) = lookup("SCHED_LOAD_LOG_LEVEL") {
            self.log_level = level;
        }

        if let Some(format) = lookup("SCHED_LOAD_LOG_FORMAT") {
            self.log_format = LogFormat::from_str(&format).map_err(SchedLoadError::Config)?;
        }

        Ok(())
    }

    /// Apply command line flags, consuming the lower layers
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(region) = overrides.region {
            self.aws.region = region;
        }
        if let Some(integrator) = overrides.integrator_id {
            self.tenant.integrator_id = Some(integrator);
        }
        if let Some(client) = overrides.client_id {
            self.tenant.client_id = normalise_client_id(client);
        }
        if let Some(bucket) = overrides.bucket {
            self.aws.bucket = Some(bucket);
        }
        if let Some(endpoint) = overrides.endpoint {
            self.aws.endpoint = Some(endpoint);
        }
        self
    }
}

/// Client ids are used exactly as written apart from surrounding whitespace.
/// A blank id counts as unset.
fn normalise_client_id(client_id: String) -> Option<String> {
    let trimmed = client_id.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
