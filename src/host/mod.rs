//! Collaborator contracts consumed by the workflow controller.
//!
//! The controller never talks to the PKCS#11 driver, the file-dialog layer,
//! or the sealing target directly. Each is an external collaborator reached
//! through one of these narrow async traits, so the orchestration logic can
//! be exercised against fakes and the host shell can plug in the real
//! implementations.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::error::Result;

#[cfg(test)]
pub(crate) mod testing;

/// Hardware-token primitives provided by the PKCS#11 host service.
#[async_trait]
pub trait TokenBackend: Send + Sync {
    /// Enumerate slots with a token present.
    ///
    /// An empty map is a valid outcome ("no devices present") and must not
    /// be reported as an error.
    async fn enumerate_slots(&self) -> Result<BTreeMap<u64, String>>;

    /// Log in to the slot with the given PIN and list the labels of the key
    /// objects it holds, in token order.
    ///
    /// Fails with [`SealerError::Authentication`](crate::SealerError) when
    /// the PIN is rejected, `KeyEnumeration` otherwise.
    async fn list_key_labels(&self, slot_id: u64, pin: &str) -> Result<Vec<String>>;

    /// Encrypt `input_path` under the named token key, writing `output_path`.
    /// Returns a human-readable status message.
    async fn encrypt(
        &self,
        slot_id: u64,
        pin: &str,
        key_label: &str,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<String>;

    /// Decrypt `encrypted_path` with the named token key and return the
    /// recovered secret. The secret is zeroized on drop.
    async fn decrypt(
        &self,
        slot_id: u64,
        pin: &str,
        key_label: &str,
        encrypted_path: &Path,
    ) -> Result<Zeroizing<String>>;
}

/// File-selection dialogs provided by the host shell.
///
/// Cancellation is `None`, never an empty path: a user closing the dialog is
/// not a failure and must stay distinguishable from a legitimately empty
/// string.
#[async_trait]
pub trait DialogProvider: Send + Sync {
    async fn pick_open_file(
        &self,
        title: &str,
        filter_pattern: &str,
        filter_label: &str,
    ) -> Option<PathBuf>;

    async fn pick_save_file(&self, title: &str, default_name: &str) -> Option<PathBuf>;
}

/// The sealing target that receives a recovered unseal key.
///
/// Treated as a black box: the wire protocol to Vault is the collaborator's
/// responsibility. Returns a status message on success.
#[async_trait]
pub trait SealTarget: Send + Sync {
    async fn unseal(&self, secret: &str) -> Result<String>;
}
