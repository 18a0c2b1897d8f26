//! Global Action Gate - single-flight admission for hardware and file
//! operations, plus the user-visible banner state.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::workflow::OperationResult;

/// Banner state owned by the gate and read by the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateStatus {
    #[default]
    Idle,
    Loading,
    Success {
        message: String,
    },
    Error {
        message: String,
    },
}

/// Admits at most one operation system-wide.
///
/// While an operation's future is unresolved any new trigger is refused, not
/// queued. The busy flag is released by a drop guard so it clears whether the
/// operation succeeded, failed, was cancelled, or panicked.
pub struct ActionGate {
    busy: AtomicBool,
    status: RwLock<GateStatus>,
}

impl ActionGate {
    pub fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
            status: RwLock::new(GateStatus::Idle),
        }
    }

    /// Run `operation` if nothing else is in flight.
    ///
    /// Returns `None` when the gate refused the trigger; the refused attempt
    /// has no observable effect on banner state or the running operation.
    /// A `Cancelled` result maps back to `Idle`: user cancellation is never
    /// shown as an error.
    pub async fn run<F>(&self, operation: F) -> Option<OperationResult>
    where
        F: Future<Output = OperationResult>,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("operation refused: another operation is already in flight");
            return None;
        }
        let _guard = BusyGuard { busy: &self.busy };

        *self.status.write().await = GateStatus::Loading;
        let result = operation.await;

        let status = match &result {
            OperationResult::Success { message } => GateStatus::Success {
                message: message.clone(),
            },
            OperationResult::Cancelled => {
                debug!("operation cancelled by user");
                GateStatus::Idle
            }
            OperationResult::Failed { message } => GateStatus::Error {
                message: message.clone(),
            },
        };
        *self.status.write().await = status;

        Some(result)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> GateStatus {
        self.status.read().await.clone()
    }

    /// Dismiss a success or error banner. Loading state is not dismissible.
    pub async fn dismiss(&self) {
        let mut status = self.status.write().await;
        if matches!(
            *status,
            GateStatus::Success { .. } | GateStatus::Error { .. }
        ) {
            *status = GateStatus::Idle;
        }
    }
}

impl Default for ActionGate {
    fn default() -> Self {
        Self::new()
    }
}

struct BusyGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}
