mod catalog;
mod directory;

pub use catalog::{AuthStatus, CatalogView, KeyCatalog, DEBOUNCE_WINDOW, MIN_PIN_LEN};
pub use directory::TokenDirectory;

use serde::{Deserialize, Serialize};

/// A detected hardware-token slot.
///
/// Immutable per detection cycle; the whole set is replaced on each
/// re-detection, never diffed incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: u64,
    pub label: String,
}
