mod gate;
mod pipeline;

pub use gate::{ActionGate, GateStatus};
pub use pipeline::{OperationPipeline, ENCRYPTED_FILE_FILTER};

use serde::Serialize;

/// Final outcome of an encrypt or decrypt-and-unseal run.
///
/// `Cancelled` is a first-class, non-error outcome: the user closed a dialog
/// and nothing should be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OperationResult {
    Success { message: String },
    Cancelled,
    Failed { message: String },
}

impl OperationResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
