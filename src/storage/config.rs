//! Configuration Resolver - load and save the module path setting.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SealerError};

const CONFIG_DIR: &str = "vault-sealer";
const CONFIG_NAME: &str = "config.json";

/// Surfaced to the user after a successful save: the loaded native module
/// cannot be swapped in-process, so detection may only pick up a new path
/// after a restart.
pub const MODULE_RESTART_NOTICE: &str =
    "Configuration saved. If a PKCS#11 module was already loaded, a restart may be required for the new module to take effect.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub module_path: String,
}

/// Owns the on-disk configuration file. Mutated only through an explicit
/// save; after a save the orchestration layer re-runs token detection.
pub struct ConfigResolver {
    path: PathBuf,
}

impl ConfigResolver {
    /// Resolver backed by the platform config directory
    /// (`<config dir>/vault-sealer/config.json`).
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            SealerError::ConfigPersist("could not determine the user config directory".into())
        })?;
        Ok(Self {
            path: config_dir.join(CONFIG_DIR).join(CONFIG_NAME),
        })
    }

    /// Resolver backed by an explicit path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the configuration. A missing file is normal (first run) and
    /// yields the default configuration, not an error.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no config file yet; using defaults");
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Persist the configuration, creating the config directory if needed.
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SealerError::ConfigPersist(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, content)
            .map_err(|e| SealerError::ConfigPersist(e.to_string()))?;
        info!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ConfigResolver::with_path(dir.path().join("config.json"));

        let config = resolver.load().unwrap();
        assert_eq!(config, Config::default());
        assert!(config.module_path.is_empty());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        // Nested path: save must create the directory.
        let resolver = ConfigResolver::with_path(dir.path().join("nested").join("config.json"));

        let config = Config {
            module_path: "/usr/lib/softhsm/libsofthsm2.so".into(),
        };
        resolver.save(&config).unwrap();

        assert_eq!(resolver.load().unwrap(), config);
    }

    #[test]
    fn test_corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let resolver = ConfigResolver::with_path(path);

        let err = resolver.load().unwrap_err();
        assert_eq!(err.code(), "SERIALIZATION_ERROR");
    }
}
