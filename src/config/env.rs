//! Environment overrides.
//!
//! `UPLINK_*` variables win over values from the config file.

use crate::error::ConfigError;

use super::Config;

pub(super) fn apply_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(url) = non_blank(env_lookup, "UPLINK_API_URL") {
        config.backends.api_url = url;
    }
    if let Some(url) = non_blank(env_lookup, "UPLINK_FILES_URL") {
        config.backends.files_url = url;
    }
    if let Some(timeout) = non_blank(env_lookup, "UPLINK_TIMEOUT_SECS") {
        let parsed = timeout.parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid UPLINK_TIMEOUT_SECS value `{timeout}`: expected positive integer seconds"
            ))
        })?;
        config.network.request_timeout_secs = parsed;
    }
    if let Some(retries) = non_blank(env_lookup, "UPLINK_MAX_RETRIES") {
        config.retry.max_retries = retries.parse::<u32>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid UPLINK_MAX_RETRIES value `{retries}`: expected a non-negative integer"
            ))
        })?;
    }
    if let Some(token) = non_blank(env_lookup, "UPLINK_TOKEN") {
        config.session.token = token;
    }
    if let Some(session_id) = non_blank(env_lookup, "UPLINK_SESSION_ID") {
        config.session.session_id = Some(session_id);
    }
    Ok(())
}

fn non_blank<FEnv>(env_lookup: &FEnv, name: &str) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
