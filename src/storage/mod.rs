mod config;
mod detect;

pub use config::{Config, ConfigResolver, MODULE_RESTART_NOTICE};
pub use detect::{find_pkcs11_module, module_filter_pattern};
