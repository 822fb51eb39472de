//! Top-level config loading pipeline.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::env::apply_env_overrides;
use super::sources::{config_root_dir, read_config_text_with_sources, ConfigSource};
use super::Config;

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from --config flag).
pub fn load_config(path_override: Option<&str>) -> Result<Config, ConfigError> {
    Ok(load_config_with_source(path_override)?.0)
}

/// Load configuration and report which file it came from.
pub fn load_config_with_source(
    path_override: Option<&str>,
) -> Result<(Config, ConfigSource), ConfigError> {
    load_config_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_root_dir,
    )
}

pub(super) fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&str>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<(Config, ConfigSource), ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let (config_text, source) =
        read_config_text_with_sources(path_override, &read_file, &config_root)?;
    let mut config: Config = toml::from_str(&config_text)?;
    apply_env_overrides(&mut config, &env_lookup)?;
    normalize(&mut config)?;
    tracing::debug!(?source, "configuration loaded");
    Ok((config, source))
}

/// Trim base URLs and reject unusable values.
fn normalize(config: &mut Config) -> Result<(), ConfigError> {
    for (name, url) in [
        ("backends.api_url", &mut config.backends.api_url),
        ("backends.files_url", &mut config.backends.files_url),
    ] {
        let trimmed = url.trim().trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid(format!("`{name}` must not be empty")));
        }
        *url = trimmed;
    }
    config.network.request_timeout_secs = config.network.request_timeout_secs.max(1);
    if config.retry.max_delay_ms < config.retry.initial_delay_ms {
        return Err(ConfigError::Invalid(format!(
            "`retry.max_delay_ms` ({}) must be at least `retry.initial_delay_ms` ({})",
            config.retry.max_delay_ms, config.retry.initial_delay_ms
        )));
    }
    if !(config.retry.backoff_factor.is_finite() && config.retry.backoff_factor >= 1.0) {
        return Err(ConfigError::Invalid(format!(
            "`retry.backoff_factor` must be a finite number >= 1, got {}",
            config.retry.backoff_factor
        )));
    }
    if config.upload.max_file_size_bytes == 0 {
        return Err(ConfigError::Invalid(
            "`upload.max_file_size_bytes` must be positive".to_string(),
        ));
    }
    Ok(())
}
