//! Error types for sched-load
//!
//! Provides structured error handling using thiserror for every failure a
//! single command can hit: provider calls against the identity directory
//! and the object store, identity shape problems, post-write verification
//! and configuration errors.
//!
//! Expected absences (deleting something that is not there, enabling what
//! is already enabled) are not errors and never show up here.

use std::fmt::Display;

use thiserror::Error;

/// Main error type for sched-load operations
#[derive(Error, Debug)]
pub enum SchedLoadError {
    /// Identity directory call failed (connectivity, auth, provider refusal)
    #[error("{operation} failed: {message}")]
    Identity {
        operation: &'static str,
        message: String,
    },

    /// Object store call failed (connectivity, auth, provider refusal)
    #[error("{operation} failed: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    /// The calling credential does not live under a recognised user path
    #[error("Unexpected user path: {0}")]
    UnexpectedIdentityPath(String),

    /// Configured client id disagrees with the one carried by the credential
    #[error("Client ID mismatch: Given client ID {given} does not match ID for IaaS credentials: {resolved}")]
    ClientIdMismatch { given: String, resolved: String },

    /// Client-scoped command run without a client id
    #[error("You must specify a client for this operation")]
    MissingClient,

    /// Upload returned but the object is not visible in a fresh listing
    #[error("Unable to find uploaded file {0}")]
    UploadVerificationFailed(String),

    /// Schedule marker write did not echo back the expected key
    #[error("Unable to confirm schedule marker {0}")]
    ScheduleSetVerificationFailed(String),

    /// A path or key that cannot stand for a single local file
    #[error("Not a usable file name: {0}")]
    InvalidFileName(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SchedLoadError {
    pub fn identity(operation: &'static str, err: impl Display) -> Self {
        SchedLoadError::Identity {
            operation,
            message: err.to_string(),
        }
    }

    pub fn storage(operation: &'static str, err: impl Display) -> Self {
        SchedLoadError::Storage {
            operation,
            message: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SchedLoadError>;
