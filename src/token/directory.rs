//! Token Directory - the set of currently detected token slots.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::Result;
use crate::host::TokenBackend;
use crate::token::Slot;

/// Holds the currently detected slots, replaced wholesale on each detection.
///
/// Detection is idempotent and repeatable: it runs at startup, on manual
/// refresh, and automatically after a configuration save. An empty result is
/// a valid "no devices present" outcome, not an error.
pub struct TokenDirectory {
    backend: Arc<dyn TokenBackend>,
    slots: RwLock<Vec<Slot>>,
}

impl TokenDirectory {
    pub fn new(backend: Arc<dyn TokenBackend>) -> Self {
        Self {
            backend,
            slots: RwLock::new(Vec::new()),
        }
    }

    /// Run slot detection and replace the known-slot set with the result.
    ///
    /// On failure the previous snapshot is kept untouched so the UI can keep
    /// rendering the last known devices alongside the error banner.
    pub async fn detect(&self) -> Result<Vec<Slot>> {
        debug!("enumerating token slots");
        let detected = self.backend.enumerate_slots().await?;

        let slots: Vec<Slot> = detected
            .into_iter()
            .map(|(id, label)| Slot { id, label })
            .collect();
        info!(count = slots.len(), "token detection complete");

        *self.slots.write().await = slots.clone();
        Ok(slots)
    }

    /// Snapshot of the current slot set.
    pub async fn slots(&self) -> Vec<Slot> {
        self.slots.read().await.clone()
    }
}
