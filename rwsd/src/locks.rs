//! Per-directory serialization of sync runs.
//!
//! Two overlapping notifications for the same repository would otherwise
//! run the update command concurrently against one working copy, which is
//! unsafe for version-control tooling. Each resolved directory gets one
//! async mutex; a second request for the same directory queues on it and
//! runs after the first completes. Distinct directories never contend.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-directory execution slots.
#[derive(Debug, Clone, Default)]
pub struct DirLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl DirLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the exclusive slot for `directory`, waiting if another
    /// sync currently holds it. The slot is released when the returned
    /// guard drops.
    pub async fn acquire(&self, directory: &Path) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().await;
            map.entry(directory.to_path_buf()).or_default().clone()
        };
        slot.lock_owned().await
    }
}
