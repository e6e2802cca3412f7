//! Synchronization error taxonomy.
//!
//! Every failure mode of a sync request maps to exactly one variant here.
//! A variant carries its transport status code and a public-safe message;
//! internal detail (paths, command output, credential material) stays in
//! the log stream and never reaches the response body. Faults that do not
//! fit any contract violation are wrapped as [`SyncError::Internal`] and
//! surface as the generic fallback.

use thiserror::Error;

/// A classified synchronization failure.
///
/// The `Display` form is the internal message (log-facing); the response
/// body must use [`SyncError::public_message`] instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The notification payload could not be parsed as JSON.
    #[error("the sync payload cannot be parsed")]
    BadPayload,

    /// The payload parsed, but `repository.url` is absent.
    #[error("the sync payload does not name a repository url")]
    MissingField,

    /// No registry entry matches the presented repository URL.
    #[error("repository {repository} is not registered")]
    NotRegistered { repository: String },

    /// The presented token does not match the expected token.
    #[error("wrong token presented for {repository}")]
    Unauthorized { repository: String },

    /// The registered directory is missing or not a directory.
    #[error("configured directory for {repository} is missing")]
    ConfigurationError { repository: String },

    /// The update command ran but failed or timed out.
    #[error("update command failed for {repository}")]
    SyncFailed { repository: String },

    /// Any fault not recognized as a contract violation.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// HTTP-style status code for this failure.
    pub fn status(&self) -> u16 {
        match self {
            Self::BadPayload | Self::MissingField | Self::NotRegistered { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::ConfigurationError { .. } | Self::SyncFailed { .. } | Self::Internal(_) => 500,
        }
    }

    /// Message safe to return to an untrusted caller.
    ///
    /// Client-caused failures are spelled out; internal failures collapse
    /// to a generic body so directory paths and command output never leak.
    /// The unauthorized message acknowledges the mismatch without echoing
    /// the presented secret.
    pub fn public_message(&self) -> String {
        match self {
            Self::BadPayload => "The JSON data cannot be parsed".to_string(),
            Self::MissingField => {
                "The JSON data does not contain the required information".to_string()
            }
            Self::NotRegistered { repository } => {
                format!("The repository {repository} has not been registered")
            }
            Self::Unauthorized { .. } => "Wrong token presented".to_string(),
            Self::ConfigurationError { .. } | Self::SyncFailed { .. } => {
                "Internal error".to_string()
            }
            Self::Internal(_) => "Whoops, looks like something went wrong.".to_string(),
        }
    }

    /// Repository URL for log correlation, when the failure is tied to one.
    pub fn repository(&self) -> Option<&str> {
        match self {
            Self::NotRegistered { repository }
            | Self::Unauthorized { repository }
            | Self::ConfigurationError { repository }
            | Self::SyncFailed { repository } => Some(repository),
            Self::BadPayload | Self::MissingField | Self::Internal(_) => None,
        }
    }
}
