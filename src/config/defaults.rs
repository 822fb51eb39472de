//! Default configuration constants.
//!
//! Keeping defaults in one module lets config types, env overrides and tests
//! share the same literals.

/// Default primary backend address.
pub(super) const DEFAULT_API_URL: &str = "http://localhost:5000";
/// Default file-service backend address.
pub(super) const DEFAULT_FILES_URL: &str = "http://localhost:5001";
/// Per-request timeout applied uniformly to every attempt.
pub(super) const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Largest file accepted by the upload pre-check (50 MiB).
pub(super) const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;
/// Config file name looked up locally and under the config root.
pub(super) const CONFIG_FILE_NAME: &str = "uplink.toml";
/// Directory name under the per-user config root.
pub(super) const CONFIG_DIR_NAME: &str = "uplink";
