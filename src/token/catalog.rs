//! Key Catalog - PIN-gated, debounced key-label lookup for one device card.
//!
//! Each expanded device card owns exactly one catalog, and each catalog owns
//! its own authentication session; PINs and fetched labels are never shared
//! across devices. PIN keystrokes restart a debounce window so that only the
//! settled PIN value ever reaches the hardware, and a generation counter
//! guarantees that a lookup resolving for a superseded PIN is discarded
//! instead of overwriting newer state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::SealerError;
use crate::host::TokenBackend;

/// Minimum PIN length before a hardware lookup is attempted.
pub const MIN_PIN_LEN: usize = 4;

/// Debounce window after the last PIN keystroke.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Authentication state of a device card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthStatus {
    /// No lookup attempted (card collapsed, PIN empty or too short).
    Idle,
    /// A debounce window or hardware lookup is in flight.
    Pending,
    /// Lookup succeeded; `key_labels` holds the result (possibly empty).
    Ready,
    /// Lookup failed; labels and selection were cleared.
    Failed { code: String, message: String },
}

/// Per-card session state. The PIN lives only here and is zeroized on drop.
struct AuthSession {
    pin: Zeroizing<String>,
    status: AuthStatus,
    key_labels: Vec<String>,
    selected_key_label: Option<String>,
}

impl AuthSession {
    fn idle() -> Self {
        Self {
            pin: Zeroizing::new(String::new()),
            status: AuthStatus::Idle,
            key_labels: Vec::new(),
            selected_key_label: None,
        }
    }
}

/// UI-facing snapshot of a catalog's session. Never carries the PIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogView {
    pub status: AuthStatus,
    pub key_labels: Vec<String>,
    pub selected_key_label: Option<String>,
}

pub struct KeyCatalog {
    slot_id: u64,
    backend: Arc<dyn TokenBackend>,
    debounce: Duration,
    /// Bumped on every PIN change and collapse. A lookup only applies its
    /// result while it still holds the current generation, which makes
    /// "last request wins" hold even when responses arrive out of order.
    generation: Arc<AtomicU64>,
    session: Arc<RwLock<AuthSession>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl KeyCatalog {
    pub fn new(slot_id: u64, backend: Arc<dyn TokenBackend>) -> Self {
        Self::with_debounce(slot_id, backend, DEBOUNCE_WINDOW)
    }

    pub fn with_debounce(slot_id: u64, backend: Arc<dyn TokenBackend>, debounce: Duration) -> Self {
        Self {
            slot_id,
            backend,
            debounce,
            generation: Arc::new(AtomicU64::new(0)),
            session: Arc::new(RwLock::new(AuthSession::idle())),
            timer: Mutex::new(None),
        }
    }

    pub fn slot_id(&self) -> u64 {
        self.slot_id
    }

    /// Handle a PIN keystroke.
    ///
    /// Supersedes any earlier pending lookup: an in-flight request for the
    /// previous PIN keeps running against the hardware but its result is
    /// discarded on arrival. A PIN below the length policy resets the session
    /// locally with zero hardware calls.
    pub async fn pin_changed(&self, pin: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if pin.len() < MIN_PIN_LEN {
            debug!(
                slot_id = self.slot_id,
                "PIN below length policy; clearing catalog"
            );
            self.clear_timer();
            let mut session = self.session.write().await;
            *session = AuthSession::idle();
            session.pin = Zeroizing::new(pin.to_owned());
            return;
        }

        {
            let mut session = self.session.write().await;
            session.pin = Zeroizing::new(pin.to_owned());
            session.status = AuthStatus::Pending;
            session.key_labels.clear();
            session.selected_key_label = None;
        }

        let backend = Arc::clone(&self.backend);
        let session = Arc::clone(&self.session);
        let generations = Arc::clone(&self.generation);
        let slot_id = self.slot_id;
        let debounce = self.debounce;
        let pin = Zeroizing::new(pin.to_owned());

        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if generations.load(Ordering::SeqCst) != generation {
                // A newer keystroke restarted the window before it elapsed.
                return;
            }

            debug!(slot_id, "PIN settled; fetching key labels");
            let outcome = backend.list_key_labels(slot_id, &pin).await;

            // Re-check under the write lock so a concurrent PIN change cannot
            // lose against a stale apply.
            let mut session = session.write().await;
            if generations.load(Ordering::SeqCst) != generation {
                debug!(slot_id, "discarding key lookup result for superseded PIN");
                return;
            }

            match outcome {
                Ok(labels) => {
                    debug!(slot_id, count = labels.len(), "key labels fetched");
                    session.selected_key_label = labels.first().cloned();
                    session.key_labels = labels;
                    session.status = AuthStatus::Ready;
                }
                Err(err) => {
                    warn!(slot_id, error = %err, "key lookup failed");
                    session.key_labels.clear();
                    session.selected_key_label = None;
                    session.status = AuthStatus::from(&err);
                }
            }
        });

        let mut timer = self.timer.lock().unwrap();
        *timer = Some(task);
    }

    /// Collapse the card: reset to Idle immediately and cancel any pending
    /// debounce timer.
    pub async fn collapse(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(timer) = self.timer.lock().unwrap().take() {
            timer.abort();
        }
        let mut session = self.session.write().await;
        *session = AuthSession::idle();
    }

    /// Select one of the fetched key labels.
    pub async fn select_key(&self, label: &str) {
        let mut session = self.session.write().await;
        if session.key_labels.iter().any(|l| l == label) {
            session.selected_key_label = Some(label.to_string());
        } else {
            warn!(
                slot_id = self.slot_id,
                label, "ignoring selection of unknown key label"
            );
        }
    }

    /// UI-facing snapshot of the session.
    pub async fn view(&self) -> CatalogView {
        let session = self.session.read().await;
        CatalogView {
            status: session.status.clone(),
            key_labels: session.key_labels.clone(),
            selected_key_label: session.selected_key_label.clone(),
        }
    }

    /// The `(pin, key_label)` pair an operation should run with, if the card
    /// is authenticated and a key is selected.
    pub async fn credentials(&self) -> Option<(Zeroizing<String>, String)> {
        let session = self.session.read().await;
        if session.status != AuthStatus::Ready {
            return None;
        }
        let label = session.selected_key_label.clone()?;
        Some((session.pin.clone(), label))
    }

    fn clear_timer(&self) {
        if let Some(timer) = self.timer.lock().unwrap().take() {
            timer.abort();
        }
    }
}

impl From<&SealerError> for AuthStatus {
    fn from(err: &SealerError) -> Self {
        AuthStatus::Failed {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
