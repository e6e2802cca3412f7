//! Daemon configuration: TOML model, loading, and registry construction.
//!
//! The configuration is read once at process start and never reloaded; the
//! registry built from it is immutable for the process lifetime.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Registry, RepoEntry, RepoUrl};

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),
    #[error("could not determine a configuration directory")]
    NoConfigDir,
    #[error("failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("repository {0} is registered more than once")]
    DuplicateRepository(String),
    #[error("sync command must not be empty")]
    EmptyCommand,
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub repositories: Vec<RepoConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Process-wide default token, used for repositories without an
    /// override token. The empty default can never match a presented
    /// token (the token path segment is always non-empty), so leaving it
    /// unset denies default-token access rather than opening it.
    #[serde(default)]
    pub default_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Hard wall-clock limit for one update-command run, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Update command argv, run with the working directory set to the
    /// sync target.
    #[serde(default = "default_command")]
    pub command: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            command: default_command(),
        }
    }
}

/// One `[[repositories]]` table: a tracked repository as written in the
/// configuration file. `directory` is kept as a string here so `~` can be
/// expanded when the registry is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    pub url: String,
    pub directory: String,
    #[serde(default)]
    pub token: Option<String>,
}

fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_command() -> Vec<String> {
    vec!["git".to_string(), "pull".to_string()]
}

impl Config {
    /// Load the configuration from `path`, or from the default location
    /// (`<config_dir>/rws/config.toml`) when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path().ok_or(ConfigError::NoConfigDir)?,
        };

        if !path.is_file() {
            return Err(ConfigError::NotFound(path));
        }

        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: Config =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Build the immutable repository registry, expanding `~` in
    /// configured directories.
    pub fn registry(&self) -> Result<Registry, ConfigError> {
        let entries = self
            .repositories
            .iter()
            .map(|repo| RepoEntry {
                url: RepoUrl::new(&repo.url),
                directory: PathBuf::from(shellexpand::tilde(&repo.directory).into_owned()),
                token: repo.token.clone(),
            })
            .collect();

        Registry::from_entries(entries)
            .map_err(|url| ConfigError::DuplicateRepository(url.to_string()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.command.is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        Ok(())
    }
}

/// Default configuration file location.
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rws").join("config.toml"))
}
