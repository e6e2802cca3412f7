//! Common types used across RWS components.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Remote identity of a tracked repository.
///
/// Used verbatim as the registry key: no trailing-slash, scheme-case, or
/// `.git`-suffix normalization is applied. Callers must present the URL
/// exactly as registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoUrl(pub String);

impl RepoUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tracked repository: the sync target for one remote URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoEntry {
    /// Remote repository URL, unique key into the registry.
    pub url: RepoUrl,
    /// Local working copy to update. Must exist as a directory at sync
    /// time; checked lazily by the executor, never at load.
    pub directory: PathBuf,
    /// Per-repository override credential. When absent, the process-wide
    /// default token applies.
    #[serde(default)]
    pub token: Option<String>,
}

/// Immutable mapping from repository URL to sync target.
///
/// Built once at startup and shared read-only by all concurrent requests;
/// there are no mutation operations.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<RepoUrl, RepoEntry>,
}

impl Registry {
    /// Build a registry from resolved entries.
    ///
    /// Returns the first duplicated URL, if any, as an error; silently
    /// shadowing a sync target is a misconfiguration worth failing on.
    pub fn from_entries(entries: Vec<RepoEntry>) -> Result<Self, RepoUrl> {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            let url = entry.url.clone();
            if map.insert(url.clone(), entry).is_some() {
                return Err(url);
            }
        }
        Ok(Self { entries: map })
    }

    /// Look up the sync target for a repository URL. Exact string match.
    pub fn resolve(&self, url: &str) -> Option<&RepoEntry> {
        self.entries.get(&RepoUrl::new(url))
    }

    /// Number of tracked repositories.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over tracked entries (startup logging, status reporting).
    pub fn entries(&self) -> impl Iterator<Item = &RepoEntry> {
        self.entries.values()
    }
}
