//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`UPLINK_API_URL`, `UPLINK_FILES_URL`,
//!    `UPLINK_TIMEOUT_SECS`, `UPLINK_MAX_RETRIES`, `UPLINK_TOKEN`,
//!    `UPLINK_SESSION_ID`)
//! 2. TOML file specified via --config CLI flag
//! 3. ./uplink.toml in the current directory
//! 4. $XDG_CONFIG_HOME/uplink/uplink.toml (or ~/.config/uplink/uplink.toml)
//! 5. Built-in defaults

mod defaults;
mod env;
mod loader;
mod sources;
mod types;

pub use loader::{load_config, load_config_with_source};
pub use sources::{config_root_dir, ConfigSource};
pub use types::{BackendsConfig, Config, NetworkConfig, SessionConfig, UploadConfig};
