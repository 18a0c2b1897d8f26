//! Scripted collaborator fakes shared by the workflow tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use zeroize::Zeroizing;

use super::{DialogProvider, SealTarget, TokenBackend};
use crate::error::{Result, SealerError};

/// In-memory token backend scripted per test.
///
/// Key lookups succeed for `(slot, pin)` pairs registered via `with_keys`;
/// any other PIN is treated as an authentication failure, matching the
/// contract of the real driver.
pub(crate) struct FakeToken {
    slots: Mutex<BTreeMap<u64, String>>,
    keys: Mutex<HashMap<(u64, String), Vec<String>>>,
    /// Artificial latency per PIN, for exercising stale-response handling.
    lookup_delays: Mutex<HashMap<String, Duration>>,
    pub lookup_calls: AtomicUsize,
    pub encrypt_calls: AtomicUsize,
    pub decrypt_calls: AtomicUsize,
    pub fail_enumerate: AtomicBool,
    pub fail_encrypt: AtomicBool,
    pub fail_decrypt: AtomicBool,
    secret: String,
}

impl FakeToken {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(BTreeMap::from([(1, "TokenA (SoftHSM)".to_string())])),
            keys: Mutex::new(HashMap::from([(
                (1, "9876".to_string()),
                vec!["unseal-key".to_string()],
            )])),
            lookup_delays: Mutex::new(HashMap::new()),
            lookup_calls: AtomicUsize::new(0),
            encrypt_calls: AtomicUsize::new(0),
            decrypt_calls: AtomicUsize::new(0),
            fail_enumerate: AtomicBool::new(false),
            fail_encrypt: AtomicBool::new(false),
            fail_decrypt: AtomicBool::new(false),
            secret: "shhh-unseal-key-material".to_string(),
        }
    }

    pub fn with_keys(self, slot_id: u64, pin: &str, labels: &[&str]) -> Self {
        self.keys.lock().unwrap().insert(
            (slot_id, pin.to_string()),
            labels.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    pub fn with_slots(self, slots: &[(u64, &str)]) -> Self {
        *self.slots.lock().unwrap() = slots
            .iter()
            .map(|(id, label)| (*id, label.to_string()))
            .collect();
        self
    }

    pub fn delay_lookup(&self, pin: &str, delay: Duration) {
        self.lookup_delays
            .lock()
            .unwrap()
            .insert(pin.to_string(), delay);
    }

    pub fn set_slots(&self, slots: &[(u64, &str)]) {
        *self.slots.lock().unwrap() = slots
            .iter()
            .map(|(id, label)| (*id, label.to_string()))
            .collect();
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

#[async_trait]
impl TokenBackend for FakeToken {
    async fn enumerate_slots(&self) -> Result<BTreeMap<u64, String>> {
        if self.fail_enumerate.load(Ordering::SeqCst) {
            return Err(SealerError::DeviceEnumeration("CKR_GENERAL_ERROR".into()));
        }
        Ok(self.slots.lock().unwrap().clone())
    }

    async fn list_key_labels(&self, slot_id: u64, pin: &str) -> Result<Vec<String>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.lookup_delays.lock().unwrap().get(pin).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let keys = self.keys.lock().unwrap();
        match keys.get(&(slot_id, pin.to_string())) {
            Some(labels) => Ok(labels.clone()),
            None => Err(SealerError::Authentication),
        }
    }

    async fn encrypt(
        &self,
        _slot_id: u64,
        _pin: &str,
        _key_label: &str,
        _input_path: &Path,
        output_path: &Path,
    ) -> Result<String> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_encrypt.load(Ordering::SeqCst) {
            return Err(SealerError::Encryption("CKR_DEVICE_ERROR".into()));
        }
        Ok(format!(
            "File encrypted successfully to {}",
            output_path.display()
        ))
    }

    async fn decrypt(
        &self,
        _slot_id: u64,
        _pin: &str,
        _key_label: &str,
        _encrypted_path: &Path,
    ) -> Result<Zeroizing<String>> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_decrypt.load(Ordering::SeqCst) {
            return Err(SealerError::Decryption(
                "wrong key or corrupted file".into(),
            ));
        }
        Ok(Zeroizing::new(self.secret.clone()))
    }
}

/// Dialog provider that replays a queue of scripted responses.
pub(crate) struct FakeDialogs {
    responses: Mutex<VecDeque<Option<PathBuf>>>,
    pub open_calls: AtomicUsize,
    pub save_calls: AtomicUsize,
}

impl FakeDialogs {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            open_calls: AtomicUsize::new(0),
            save_calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, response: Option<&str>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(response.map(PathBuf::from));
    }

    fn next(&self) -> Option<PathBuf> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("test requested more dialogs than were scripted")
    }
}

#[async_trait]
impl DialogProvider for FakeDialogs {
    async fn pick_open_file(
        &self,
        _title: &str,
        _filter_pattern: &str,
        _filter_label: &str,
    ) -> Option<PathBuf> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        self.next()
    }

    async fn pick_save_file(&self, _title: &str, _default_name: &str) -> Option<PathBuf> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.next()
    }
}

/// Sealing target fake recording whether it was ever reached.
pub(crate) struct FakeSeal {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeSeal {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SealTarget for FakeSeal {
    async fn unseal(&self, _secret: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SealerError::Unseal("vault returned 503".into()));
        }
        Ok("Unseal successful. Sealed: false, Progress: 1/3".to_string())
    }
}
