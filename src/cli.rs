//! Command line interface
//!
//! Parses the command tree, resolves the tenant, wires the provider
//! backends and turns every operation's result into an [`Outcome`]: a typed
//! record of what happened that renders either as the sentences operators
//! are used to or as JSON.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use crate::account::{resolve_identity, resolve_tenant, AccountManager};
use crate::config::{Config, Overrides};
use crate::errors::{Result, SchedLoadError};
use crate::facade::{FileFacade, ScheduleInterval, ScheduleStatus};
use crate::identity::{self, ConnectionType, Credentials, IdentityBackend};
use crate::notification::NotificationReconciler;
use crate::storage::{self, TenantStorage};

/// uploads files to public IaaS & publishes a schedule for regular file uploads
#[derive(Parser, Debug)]
#[command(name = "sched-load", version, arg_required_else_help = true)]
pub struct Cli {
    /// Cloud region
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Integrator id (default: taken from the credentials)
    #[arg(long, global = true)]
    pub integrator: Option<String>,

    /// Client id to act on (default: taken from client credentials)
    #[arg(long, global = true)]
    pub client: Option<String>,

    /// Bucket holding client files (default: the integrator id)
    #[arg(long, global = true)]
    pub bucket: Option<String>,

    /// Custom S3 endpoint URL
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            region: self.region.clone(),
            integrator_id: self.integrator.clone(),
            client_id: self.client.clone(),
            bucket: self.bucket.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show which credential is connected and the ids in use
    #[command(alias = "st")]
    Status,

    /// Create or delete client accounts (integrator credentials)
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },

    /// Upload, list, download and delete data files
    #[command(alias = "df")]
    DataFile {
        #[command(subcommand)]
        action: DataFileAction,
    },

    /// Collect files as soon as they are uploaded
    #[command(alias = "ic")]
    ImmediateCollection {
        #[command(subcommand)]
        action: CollectionAction,
    },

    /// Collect files on a schedule
    #[command(alias = "sc")]
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ClientAction {
    /// Create the client user, its group membership and an access key
    Create,
    /// Delete the client user and its access keys
    Delete {
        /// Also delete every file the client uploaded
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum DataFileAction {
    /// Upload a local file for collection
    Upload {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Delete an uploaded file
    Delete {
        /// Key relative to the client's storage
        #[arg(short, long)]
        remote: String,
    },
    /// Download an uploaded file
    Download {
        #[arg(short, long)]
        remote: String,
        /// Local directory, created if missing
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// List files awaiting collection
    #[command(alias = "lu")]
    ListUploaded,
}

#[derive(Subcommand, Debug)]
pub enum CollectionAction {
    Status,
    Enable,
    Disable,
}

#[derive(Subcommand, Debug)]
pub enum ScheduleAction {
    Status,
    Daily,
    None,
}

/// Result of one command
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Status {
        connection_type: ConnectionType,
        client_id: Option<String>,
        integrator_id: String,
        account_id: String,
    },
    AccountCreated {
        client_id: String,
        credentials: Credentials,
    },
    AccountDeleted {
        client_id: String,
        existed: bool,
        files_purged: bool,
    },
    Uploaded {
        key: String,
    },
    FileDeleted {
        key: String,
        existed: bool,
    },
    Downloaded {
        key: String,
        path: PathBuf,
    },
    FileList {
        files: Vec<String>,
    },
    CollectionEnabled {
        changed: bool,
    },
    CollectionDisabled {
        changed: bool,
    },
    CollectionStatus {
        enabled: bool,
    },
    ScheduleSet {
        schedule: &'static str,
    },
    ScheduleRemoved {
        existed: bool,
    },
    Schedule {
        schedule: ScheduleStatus,
    },
}

impl Outcome {
    /// Outcomes that report a failure without being an error value
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Outcome::Schedule {
                schedule: ScheduleStatus::Error
            }
        )
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Text => Ok(self.to_string()),
            OutputFormat::Json => Ok(serde_json::to_string(self)?),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Status {
                connection_type,
                client_id,
                integrator_id,
                account_id,
            } => {
                writeln!(f, "connected")?;
                writeln!(f, "Credential Type: {}", connection_type)?;
                writeln!(f, "Client ID: {}", client_id.as_deref().unwrap_or("none set"))?;
                writeln!(f, "Integrator ID: {}", integrator_id)?;
                write!(f, "Account ID: {}", account_id)
            }
            Outcome::AccountCreated {
                client_id,
                credentials,
            } => {
                writeln!(f, "created account {}", client_id)?;
                write!(f, "Credentials are {}", credentials)
            }
            Outcome::AccountDeleted {
                client_id,
                existed,
                files_purged,
            } => {
                if *existed {
                    write!(f, "deleted account {}", client_id)?;
                } else {
                    write!(f, "{} account did not exist", client_id)?;
                }
                if *files_purged {
                    write!(f, "\nremoved any data files for account {}", client_id)?;
                }
                Ok(())
            }
            Outcome::Uploaded { key } => write!(f, "uploaded {}", key),
            Outcome::FileDeleted { key, existed: true } => write!(f, "deleted {}", key),
            Outcome::FileDeleted { key, existed: false } => write!(f, "{} did not exist", key),
            Outcome::Downloaded { key, path } => {
                write!(f, "downloaded {} to {}", key, path.display())
            }
            Outcome::FileList { files } => {
                write!(f, "listing files:")?;
                for file in files {
                    write!(f, "\n{}", file)?;
                }
                Ok(())
            }
            Outcome::CollectionEnabled { changed: true } => {
                write!(f, "Enabled immediate collection")
            }
            Outcome::CollectionEnabled { changed: false } => {
                write!(f, "Immediate collection was already enabled")
            }
            Outcome::CollectionDisabled { changed: true } => {
                write!(f, "Disabled immediate collection")
            }
            Outcome::CollectionDisabled { changed: false } => {
                write!(f, "Immediate collection was already disabled")
            }
            Outcome::CollectionStatus { enabled } => write!(
                f,
                "Immediate collection status is {}",
                if *enabled { "enabled" } else { "disabled" }
            ),
            Outcome::ScheduleSet { schedule } => {
                write!(f, "Set {} schedule", schedule.to_lowercase())
            }
            Outcome::ScheduleRemoved { existed: true } => write!(f, "Removed schedule"),
            Outcome::ScheduleRemoved { existed: false } => write!(f, "No schedule was set"),
            Outcome::Schedule { schedule } => write!(f, "existing schedule: {}", schedule),
        }
    }
}

/// Run one command against the configured cloud account
pub async fn run(command: Commands, config: &Config) -> anyhow::Result<Outcome> {
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws.region.clone()))
        .load()
        .await;
    let identity = identity::create_backend(&sdk_config);

    if let Commands::Status = command {
        return Ok(status(identity.as_ref(), config).await?);
    }

    let tenant = resolve_tenant(identity.as_ref(), config).await?;
    let bucket = config
        .aws
        .bucket
        .clone()
        .unwrap_or_else(|| tenant.integrator_id.clone());
    info!(
        client_id = %tenant.client_id,
        integrator_id = %tenant.integrator_id,
        bucket = %bucket,
        "Tenant resolved"
    );

    let backend = storage::create_backend(&sdk_config, &config.aws, &bucket);
    let outcome = dispatch(command, identity, TenantStorage::new(backend, tenant)).await?;
    Ok(outcome)
}

async fn status(identity: &dyn IdentityBackend, config: &Config) -> Result<Outcome> {
    let configured_client = config.tenant.client_id.as_deref();
    let details = resolve_identity(identity, configured_client).await?;
    Ok(Outcome::Status {
        connection_type: details.connection_type,
        client_id: details
            .client_id
            .or_else(|| configured_client.map(str::to_string)),
        integrator_id: details.integrator_id,
        account_id: details.account_id,
    })
}

/// Run a client-scoped command against already built backends
async fn dispatch(
    command: Commands,
    identity: Arc<dyn IdentityBackend>,
    storage: TenantStorage,
) -> Result<Outcome> {
    let client_id = storage.tenant().client_id.clone();

    let outcome = match command {
        Commands::Status => {
            return Err(SchedLoadError::Config(
                "status is not a client-scoped command".to_string(),
            ))
        }
        Commands::Client { action } => {
            let accounts = AccountManager::new(identity, storage);
            match action {
                ClientAction::Create => Outcome::AccountCreated {
                    credentials: accounts.create_client_account().await?,
                    client_id,
                },
                ClientAction::Delete { force } => Outcome::AccountDeleted {
                    existed: accounts.delete_client_account(force).await?,
                    files_purged: force,
                    client_id,
                },
            }
        }
        Commands::DataFile { action } => {
            let files = FileFacade::new(storage);
            match action {
                DataFileAction::Upload { file } => Outcome::Uploaded {
                    key: files.upload_data_file(&file).await?,
                },
                DataFileAction::Delete { remote } => Outcome::FileDeleted {
                    existed: files.delete_data_file(&remote).await?,
                    key: remote,
                },
                DataFileAction::Download { remote, dir } => Outcome::Downloaded {
                    path: files.download_data_file(&remote, &dir).await?,
                    key: remote,
                },
                DataFileAction::ListUploaded => Outcome::FileList {
                    files: files.list_data_files().await?,
                },
            }
        }
        Commands::ImmediateCollection { action } => {
            let notifications = NotificationReconciler::new(storage);
            match action {
                CollectionAction::Status => Outcome::CollectionStatus {
                    enabled: notifications.has_notification().await?,
                },
                CollectionAction::Enable => Outcome::CollectionEnabled {
                    changed: notifications.add_notification().await?,
                },
                CollectionAction::Disable => Outcome::CollectionDisabled {
                    changed: notifications.remove_notification().await?,
                },
            }
        }
        Commands::Schedule { action } => {
            let files = FileFacade::new(storage);
            match action {
                ScheduleAction::Status => Outcome::Schedule {
                    schedule: files.get_schedule().await,
                },
                ScheduleAction::Daily => {
                    let interval = ScheduleInterval::Daily;
                    if !files.set_schedule(interval).await? {
                        return Err(SchedLoadError::ScheduleSetVerificationFailed(
                            interval.marker_key(),
                        ));
                    }
                    Outcome::ScheduleSet {
                        schedule: interval.as_str(),
                    }
                }
                ScheduleAction::None => Outcome::ScheduleRemoved {
                    existed: files.remove_schedule().await?,
                },
            }
        }
    };
    Ok(outcome)
}
