//! Operation Pipeline - sequences the multi-step encrypt and
//! decrypt-and-unseal operations.
//!
//! Every step is strictly sequential: file selection, then the hardware
//! call, then (for decrypt) forwarding to the sealing target. Cancelling a
//! dialog short-circuits all remaining steps with zero hardware calls.

use std::sync::Arc;

use tracing::{info, warn};

use crate::host::{DialogProvider, SealTarget, TokenBackend};
use crate::workflow::OperationResult;

/// Filter pattern for the conventional encrypted-file extension.
pub const ENCRYPTED_FILE_FILTER: &str = "*.enc";

/// Suggested name for a freshly encrypted unseal key.
const DEFAULT_OUTPUT_NAME: &str = "unseal-key.enc";

pub struct OperationPipeline {
    backend: Arc<dyn TokenBackend>,
    dialogs: Arc<dyn DialogProvider>,
    seal: Arc<dyn SealTarget>,
}

impl OperationPipeline {
    pub fn new(
        backend: Arc<dyn TokenBackend>,
        dialogs: Arc<dyn DialogProvider>,
        seal: Arc<dyn SealTarget>,
    ) -> Self {
        Self {
            backend,
            dialogs,
            seal,
        }
    }

    /// Encrypt a local file under the selected token key.
    ///
    /// Input file, then output file, then the hardware call. The backend's
    /// status message becomes the success message.
    pub async fn run_encrypt(&self, slot_id: u64, pin: &str, key_label: &str) -> OperationResult {
        let Some(input_path) = self
            .dialogs
            .pick_open_file("Select the file holding the unseal key", "", "All Files")
            .await
        else {
            info!(slot_id, "encrypt cancelled at input file selection");
            return OperationResult::Cancelled;
        };

        let Some(output_path) = self
            .dialogs
            .pick_save_file("Save encrypted file as", DEFAULT_OUTPUT_NAME)
            .await
        else {
            info!(slot_id, "encrypt cancelled at output file selection");
            return OperationResult::Cancelled;
        };

        info!(slot_id, key_label, "starting hardware encrypt");
        match self
            .backend
            .encrypt(slot_id, pin, key_label, &input_path, &output_path)
            .await
        {
            Ok(message) => OperationResult::success(message),
            Err(err) => {
                warn!(slot_id, error = %err, "hardware encrypt failed");
                OperationResult::failed(err.to_string())
            }
        }
    }

    /// Decrypt a previously encrypted file and forward the recovered secret
    /// to the sealing target.
    ///
    /// Once sealing has been attempted, the decrypt result is never
    /// re-exposed: the secret is dropped (and zeroized) here, whether
    /// sealing succeeded or not.
    pub async fn run_decrypt(&self, slot_id: u64, pin: &str, key_label: &str) -> OperationResult {
        let Some(encrypted_path) = self
            .dialogs
            .pick_open_file(
                "Select the encrypted unseal key file",
                ENCRYPTED_FILE_FILTER,
                "Encrypted Files",
            )
            .await
        else {
            info!(slot_id, "decrypt cancelled at file selection");
            return OperationResult::Cancelled;
        };

        info!(slot_id, key_label, "starting hardware decrypt");
        let secret = match self
            .backend
            .decrypt(slot_id, pin, key_label, &encrypted_path)
            .await
        {
            Ok(secret) => secret,
            Err(err) => {
                warn!(slot_id, error = %err, "hardware decrypt failed");
                return OperationResult::failed(err.to_string());
            }
        };

        info!(
            slot_id,
            "unseal key recovered; forwarding to sealing target"
        );
        match self.seal.unseal(&secret).await {
            Ok(status) => OperationResult::success(status),
            Err(err) => {
                warn!(slot_id, error = %err, "sealing failed after successful decrypt");
                OperationResult::failed(format!(
                    "Sealing failed after the key was decrypted: {err}. The recovered key was discarded."
                ))
            }
        }
    }
}
