//! Shared building blocks for the Repository Webhook Synchronizer.
//!
//! This crate holds everything the daemon needs that is not tied to the
//! HTTP surface: the configuration model and loader, the registry of
//! tracked repositories, the synchronization error taxonomy, and the
//! credential-redaction helpers used before anything reaches a log line.

pub mod config;
pub mod errors;
pub mod redact;
pub mod types;

pub use config::{Config, ConfigError};
pub use errors::SyncError;
pub use types::{Registry, RepoEntry, RepoUrl};
