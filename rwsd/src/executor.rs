//! Bounded execution of the update command.
//!
//! One [`SyncExecutor::run`] call is one update attempt: verify the sync
//! target exists, spawn the configured command with its working directory
//! set there, wait under a hard wall-clock limit, and report the outcome.
//! Exit status is the only thing inspected; the command's output is
//! captured for logging but never parsed for semantics.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

use rws_common::config::{ConfigError, SyncConfig};

/// Failure to attempt an update run at all.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The sync target does not exist as a directory. Checked before any
    /// process is spawned; classified upstream as a configuration fault.
    #[error("sync target {0} does not exist or is not a directory")]
    MissingDirectory(PathBuf),

    /// The update command could not be spawned.
    #[error("failed to spawn update command")]
    Spawn(#[source] std::io::Error),
}

/// Outcome of one update-command run.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Exit status zero and no timeout.
    pub success: bool,
    /// The run exceeded the wall-clock limit and was killed. Partial
    /// output produced before the kill is still captured.
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs the configured update command against sync targets.
#[derive(Debug, Clone)]
pub struct SyncExecutor {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl SyncExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(sync: &SyncConfig) -> Result<Self, ConfigError> {
        let (program, args) = sync.command.split_first().ok_or(ConfigError::EmptyCommand)?;
        Ok(Self::new(
            program.clone(),
            args.to_vec(),
            Duration::from_secs(sync.timeout_secs),
        ))
    }

    /// Run one update attempt against `directory`.
    ///
    /// Suspends the calling task until the command exits or the limit
    /// fires; a timed-out command is killed and reported as a failed
    /// outcome, not distinguished from a nonzero exit by the caller.
    pub async fn run(&self, directory: &Path) -> Result<SyncOutcome, ExecError> {
        if !directory.is_dir() {
            return Err(ExecError::MissingDirectory(directory.to_path_buf()));
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ExecError::Spawn)?;

        // Drain both pipes concurrently with the wait; a chatty command
        // against a full pipe would otherwise deadlock.
        let stdout_task = tokio::spawn(read_pipe(child.stdout.take()));
        let stderr_task = tokio::spawn(read_pipe(child.stderr.take()));

        let (success, timed_out) = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => (status.success(), false),
            Ok(Err(err)) => {
                debug!("failed to wait on update command: {}", err);
                (false, false)
            }
            Err(_) => {
                // The kill closes the pipes, so the reader tasks finish
                // with whatever partial output the command produced.
                if let Err(err) = child.kill().await {
                    debug!("failed to kill timed-out update command: {}", err);
                }
                (false, true)
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        Ok(SyncOutcome {
            success,
            timed_out,
            stdout,
            stderr,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

async fn read_pipe<R>(pipe: Option<R>) -> String
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}
