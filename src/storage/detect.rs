//! Best-effort auto-detection of a PKCS#11 module in conventional locations.

use std::ffi::OsString;
use std::path::PathBuf;

use tracing::debug;

/// Environment variable consulted when no conventional location matches.
const MODULE_ENV_VAR: &str = "PKCS11_LIB_PATH";

/// Probe well-known SoftHSM/OpenSC/YubiKey library locations for the current
/// platform, then the `PKCS11_LIB_PATH` environment variable.
pub fn find_pkcs11_module() -> Option<PathBuf> {
    find_module_in(&candidate_paths(), std::env::var_os(MODULE_ENV_VAR))
}

/// Dialog filter pattern for module libraries on the current platform.
pub fn module_filter_pattern() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "*.so"
    }
    #[cfg(target_os = "macos")]
    {
        "*.dylib;*.so"
    }
    #[cfg(target_os = "windows")]
    {
        "*.dll"
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        "*"
    }
}

fn find_module_in(candidates: &[PathBuf], env_override: Option<OsString>) -> Option<PathBuf> {
    for candidate in candidates {
        if candidate.exists() {
            debug!(path = %candidate.display(), "found PKCS#11 module");
            return Some(candidate.clone());
        }
    }
    env_override.filter(|v| !v.is_empty()).map(PathBuf::from)
}

#[cfg(target_os = "linux")]
fn candidate_paths() -> Vec<PathBuf> {
    [
        // SoftHSM
        "/usr/lib/x86_64-linux-gnu/softhsm/libsofthsm2.so",
        "/usr/lib/softhsm/libsofthsm2.so",
        // OpenSC
        "/usr/lib/x86_64-linux-gnu/opensc-pkcs11.so",
        // Yubico
        "/usr/lib/x86_64-linux-gnu/libykcs11.so",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(target_os = "macos")]
fn candidate_paths() -> Vec<PathBuf> {
    [
        // OpenSC (Homebrew)
        "/usr/local/lib/opensc-pkcs11.so",
        // Yubico
        "/usr/local/lib/libykcs11.dylib",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(target_os = "windows")]
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(system_root) = std::env::var_os("SystemRoot") {
        paths.push(
            PathBuf::from(system_root)
                .join("System32")
                .join("opensc-pkcs11.dll"),
        );
    }
    if let Some(program_files) = std::env::var_os("ProgramFiles") {
        paths.push(
            PathBuf::from(program_files)
                .join("Yubico")
                .join("Yubico PIV Tool")
                .join("bin")
                .join("lib")
                .join("libykcs11.dll"),
        );
    }
    paths
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn candidate_paths() -> Vec<PathBuf> {
    Vec::new()
}
