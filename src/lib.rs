//! Workflow controller for unlocking Vault unseal keys with a PKCS#11
//! hardware token.
//!
//! This crate turns raw hardware-token primitives (enumerate slots, log in
//! with a PIN, list key objects, encrypt, decrypt) into a safe, race-free
//! workflow: per-device PIN-gated authentication with debounced key lookups,
//! strictly sequential encrypt/decrypt pipelines with first-class user
//! cancellation, and a single-flight gate over all hardware and file
//! operations.
//!
//! The PKCS#11 driver itself, the file dialogs, and the Vault unseal call
//! are external collaborators reached through the traits in [`host`];
//! [`state::SealerState`] is the facade a host shell drives.

pub mod error;
pub mod host;
pub mod state;
pub mod storage;
pub mod token;
pub mod workflow;

pub use error::{Result, SealerError};
pub use state::SealerState;
pub use storage::Config;
pub use token::Slot;
pub use workflow::OperationResult;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for a host binary. Honors `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vault_sealer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
