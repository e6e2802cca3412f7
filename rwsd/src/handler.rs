//! The synchronization request handler.
//!
//! One call to [`synchronize`] is one notification: resolve the repository
//! against the registry, check the presented token, take the directory's
//! execution slot, run the update command, and classify whatever happened.
//! The sequence is strictly fail-fast; no step is revisited and no
//! external process is spawned for unregistered or unauthorized requests.

use tracing::{error, info, warn};

use rws_common::errors::SyncError;
use rws_common::redact::mask_token;
use rws_common::types::{Registry, RepoEntry};

use crate::executor::{ExecError, SyncExecutor};
use crate::locks::DirLocks;

/// Shared daemon state handed to every request.
#[derive(Debug)]
pub struct AppState {
    /// Tracked repositories, immutable after startup.
    pub registry: Registry,
    /// Process-wide default token for entries without an override.
    pub default_token: String,
    pub executor: SyncExecutor,
    pub locks: DirLocks,
}

/// Handle one synchronization request for `repository`.
pub async fn synchronize(
    state: &AppState,
    repository: &str,
    presented_token: &str,
) -> Result<(), SyncError> {
    info!(repository = %repository, "synchronization request");

    let Some(entry) = state.registry.resolve(repository) else {
        return Err(SyncError::NotRegistered {
            repository: repository.to_string(),
        });
    };

    authorize(entry, &state.default_token, presented_token)?;

    // Overlapping requests for the same working copy queue here instead
    // of racing the update command against each other.
    let _slot = state.locks.acquire(&entry.directory).await;

    let outcome = match state.executor.run(&entry.directory).await {
        Ok(outcome) => outcome,
        Err(ExecError::MissingDirectory(path)) => {
            error!(
                repository = %repository,
                directory = %path.display(),
                "sync target directory is missing"
            );
            return Err(SyncError::ConfigurationError {
                repository: repository.to_string(),
            });
        }
        Err(ExecError::Spawn(err)) => {
            error!(
                repository = %repository,
                directory = %entry.directory.display(),
                error = %err,
                "update command could not be spawned"
            );
            return Err(SyncError::SyncFailed {
                repository: repository.to_string(),
            });
        }
    };

    if outcome.success {
        info!(
            repository = %repository,
            stdout = %outcome.stdout,
            "successfully pulled repository"
        );
        Ok(())
    } else {
        error!(
            repository = %repository,
            directory = %entry.directory.display(),
            timed_out = outcome.timed_out,
            stderr = %outcome.stderr,
            "update command failed"
        );
        Err(SyncError::SyncFailed {
            repository: repository.to_string(),
        })
    }
}

/// Check the presented token against the entry's expected token.
///
/// The expected token is the entry's override when set, else the
/// process-wide default. Comparison is exact; an empty presented token
/// against a non-empty expectation is a mismatch like any other. Only the
/// masked form of the presented value ever reaches the log.
fn authorize(entry: &RepoEntry, default_token: &str, presented: &str) -> Result<(), SyncError> {
    let expected = entry.token.as_deref().unwrap_or(default_token);
    if presented == expected {
        Ok(())
    } else {
        warn!(
            repository = %entry.url,
            presented = %mask_token(presented),
            "token mismatch"
        );
        Err(SyncError::Unauthorized {
            repository: entry.url.to_string(),
        })
    }
}
