//! Top-level orchestration state for the sealing workflow.
//!
//! `SealerState` ties the components together the way the UI drives them:
//! detection fills the Token Directory, expanding a device card creates its
//! Key Catalog, and the encrypt/decrypt triggers assemble a request from the
//! card's session and run the Operation Pipeline through the Action Gate.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{Result, SealerError};
use crate::host::{DialogProvider, SealTarget, TokenBackend};
use crate::storage::{find_pkcs11_module, module_filter_pattern, Config, ConfigResolver};
use crate::token::{CatalogView, KeyCatalog, Slot, TokenDirectory, DEBOUNCE_WINDOW};
use crate::workflow::{ActionGate, GateStatus, OperationPipeline, OperationResult};

const MISSING_FIELDS_MESSAGE: &str =
    "Select a token slot, enter the PIN, and choose a key before running an operation.";

pub struct SealerState {
    backend: Arc<dyn TokenBackend>,
    dialogs: Arc<dyn DialogProvider>,
    directory: TokenDirectory,
    /// One catalog per expanded device card, keyed by slot id.
    catalogs: RwLock<HashMap<u64, Arc<KeyCatalog>>>,
    pipeline: OperationPipeline,
    gate: ActionGate,
    config: ConfigResolver,
    debounce: Duration,
}

impl SealerState {
    /// State backed by the platform config directory.
    pub fn new(
        backend: Arc<dyn TokenBackend>,
        dialogs: Arc<dyn DialogProvider>,
        seal: Arc<dyn SealTarget>,
    ) -> Result<Self> {
        Ok(Self::with_resolver(
            backend,
            dialogs,
            seal,
            ConfigResolver::new()?,
        ))
    }

    pub fn with_resolver(
        backend: Arc<dyn TokenBackend>,
        dialogs: Arc<dyn DialogProvider>,
        seal: Arc<dyn SealTarget>,
        config: ConfigResolver,
    ) -> Self {
        Self {
            directory: TokenDirectory::new(Arc::clone(&backend)),
            catalogs: RwLock::new(HashMap::new()),
            pipeline: OperationPipeline::new(Arc::clone(&backend), Arc::clone(&dialogs), seal),
            gate: ActionGate::new(),
            config,
            debounce: DEBOUNCE_WINDOW,
            backend,
            dialogs,
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Load the configuration, prefilling an unset module path from the
    /// conventional install locations.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = self.config.load()?;
        if config.module_path.is_empty() {
            if let Some(path) = find_pkcs11_module() {
                info!(path = %path.display(), "auto-detected PKCS#11 module");
                config.module_path = path.display().to_string();
            }
        }
        Ok(config)
    }

    /// Save the configuration and immediately re-run token detection so a
    /// newly configured module takes effect without restarting this layer.
    /// The caller should still surface
    /// [`MODULE_RESTART_NOTICE`](crate::storage::MODULE_RESTART_NOTICE):
    /// an already loaded native module only changes on process restart.
    pub async fn save_config(&self, config: &Config) -> Result<Vec<Slot>> {
        self.config.save(config)?;
        info!("configuration saved; re-running token detection");
        self.refresh_slots().await
    }

    /// Let the user pick a module library through the host file dialog.
    /// `None` means the dialog was cancelled.
    pub async fn pick_module_file(&self) -> Option<PathBuf> {
        self.dialogs
            .pick_open_file(
                "Select the PKCS#11 module library",
                module_filter_pattern(),
                "PKCS#11 Modules",
            )
            .await
    }

    // =========================================================================
    // Token Directory
    // =========================================================================

    /// Re-run slot detection, replacing the slot set wholesale. Catalogs for
    /// slots that disappeared are collapsed and dropped.
    pub async fn refresh_slots(&self) -> Result<Vec<Slot>> {
        let config = self.config.load()?;
        if config.module_path.is_empty() {
            return Err(SealerError::ModuleNotConfigured);
        }

        let slots = self.directory.detect().await?;

        let removed: Vec<Arc<KeyCatalog>> = {
            let mut catalogs = self.catalogs.write().await;
            let gone: Vec<u64> = catalogs
                .keys()
                .filter(|id| !slots.iter().any(|s| s.id == **id))
                .copied()
                .collect();
            gone.into_iter()
                .filter_map(|id| catalogs.remove(&id))
                .collect()
        };
        for catalog in removed {
            catalog.collapse().await;
        }

        Ok(slots)
    }

    pub async fn slots(&self) -> Vec<Slot> {
        self.directory.slots().await
    }

    // =========================================================================
    // Device cards
    // =========================================================================

    /// Expand a device card, creating its catalog on first expansion.
    pub async fn expand_card(&self, slot_id: u64) -> Arc<KeyCatalog> {
        let mut catalogs = self.catalogs.write().await;
        Arc::clone(catalogs.entry(slot_id).or_insert_with(|| {
            Arc::new(KeyCatalog::with_debounce(
                slot_id,
                Arc::clone(&self.backend),
                self.debounce,
            ))
        }))
    }

    /// Collapse a device card: its session resets to Idle and any pending
    /// debounce timer is cancelled.
    pub async fn collapse_card(&self, slot_id: u64) {
        let catalog = self.catalogs.write().await.remove(&slot_id);
        if let Some(catalog) = catalog {
            catalog.collapse().await;
        }
    }

    /// Forward a PIN keystroke to the card's catalog. A card that is not
    /// expanded never triggers a lookup.
    pub async fn pin_changed(&self, slot_id: u64, pin: &str) {
        match self.catalog(slot_id).await {
            Some(catalog) => catalog.pin_changed(pin).await,
            None => warn!(
                slot_id,
                "PIN change for a card that is not expanded; ignoring"
            ),
        }
    }

    pub async fn select_key(&self, slot_id: u64, label: &str) {
        if let Some(catalog) = self.catalog(slot_id).await {
            catalog.select_key(label).await;
        }
    }

    pub async fn card_view(&self, slot_id: u64) -> Option<CatalogView> {
        match self.catalog(slot_id).await {
            Some(catalog) => Some(catalog.view().await),
            None => None,
        }
    }

    async fn catalog(&self, slot_id: u64) -> Option<Arc<KeyCatalog>> {
        self.catalogs.read().await.get(&slot_id).cloned()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Run the encrypt pipeline for a card through the single-flight gate.
    /// `None` means another operation is already in flight.
    pub async fn encrypt(&self, slot_id: u64) -> Option<OperationResult> {
        let credentials = self.card_credentials(slot_id).await;
        self.gate
            .run(async {
                match credentials {
                    Some((pin, label)) => self.pipeline.run_encrypt(slot_id, &pin, &label).await,
                    None => OperationResult::failed(MISSING_FIELDS_MESSAGE),
                }
            })
            .await
    }

    /// Run the decrypt-and-unseal pipeline for a card through the gate.
    pub async fn decrypt_and_unseal(&self, slot_id: u64) -> Option<OperationResult> {
        let credentials = self.card_credentials(slot_id).await;
        self.gate
            .run(async {
                match credentials {
                    Some((pin, label)) => self.pipeline.run_decrypt(slot_id, &pin, &label).await,
                    None => OperationResult::failed(MISSING_FIELDS_MESSAGE),
                }
            })
            .await
    }

    async fn card_credentials(&self, slot_id: u64) -> Option<(zeroize::Zeroizing<String>, String)> {
        self.catalog(slot_id).await?.credentials().await
    }

    // =========================================================================
    // Banner state
    // =========================================================================

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    pub async fn banner(&self) -> GateStatus {
        self.gate.status().await
    }

    pub async fn dismiss_banner(&self) {
        self.gate.dismiss().await;
    }
}
