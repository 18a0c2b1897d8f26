//! Error taxonomy for the sealing workflow.
//!
//! Every collaborator failure is converted into one of these kinds at the
//! component boundary that invoked it, with a user-safe message. PIN values
//! never appear in any variant.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SealerError {
    /// Slot enumeration against the PKCS#11 module failed.
    #[error("Device enumeration failed: {0}")]
    DeviceEnumeration(String),

    /// No PKCS#11 module path is configured.
    /// The UI should offer to open the configuration screen rather than
    /// render a generic error banner.
    #[error("PKCS#11 module path is not configured")]
    ModuleNotConfigured,

    /// Token login was rejected; the PIN is incorrect.
    #[error("Authentication failed: the PIN was rejected by the token")]
    Authentication,

    /// Listing key objects failed for a reason other than a bad PIN.
    #[error("Key enumeration failed: {0}")]
    KeyEnumeration(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// The sealing target rejected the recovered secret.
    #[error("Unseal request failed: {0}")]
    Unseal(String),

    #[error("Failed to persist configuration: {0}")]
    ConfigPersist(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SealerError {
    /// Stable error code for programmatic handling in the UI layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DeviceEnumeration(_) => "DEVICE_ENUMERATION_FAILED",
            Self::ModuleNotConfigured => "MODULE_NOT_CONFIGURED",
            Self::Authentication => "AUTHENTICATION_FAILED",
            Self::KeyEnumeration(_) => "KEY_ENUMERATION_FAILED",
            Self::Encryption(_) => "ENCRYPTION_FAILED",
            Self::Decryption(_) => "DECRYPTION_FAILED",
            Self::Unseal(_) => "UNSEAL_FAILED",
            Self::ConfigPersist(_) => "CONFIG_PERSIST_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl serde::Serialize for SealerError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        // Serialize as a structured object for better frontend handling
        let mut state = serializer.serialize_struct("SealerError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

pub type Result<T> = std::result::Result<T, SealerError>;
