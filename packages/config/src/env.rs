// ABOUTME: Environment variable parsing utilities
// ABOUTME: Unset variables fall back to defaults; set-but-invalid variables are errors

use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {name} has invalid value '{value}'")]
    InvalidValue { name: String, value: String },
    #[error("Missing required setting: {0}")]
    Missing(String),
    #[error("{name} is out of range: {value}")]
    OutOfRange { name: String, value: String },
}

/// Read a string variable, falling back to `default` when unset or blank
pub fn env_or(var_name: &str, default: &str) -> String {
    std::env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, returning `default` when it is not set.
/// A value that is set but does not parse is reported instead of ignored.
pub fn parse_env<T>(var_name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match std::env::var(var_name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: var_name.to_string(),
                    value: raw.clone(),
                })
        }
        _ => Ok(default),
    }
}

/// Parse an environment variable with fallback to another variable
/// Tries the primary variable first, then the secondary, then the default
pub fn parse_env_with_fallback<T>(
    primary_var: &str,
    fallback_var: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
{
    if std::env::var(primary_var).is_ok() {
        parse_env(primary_var, default)
    } else {
        if std::env::var(fallback_var).is_ok() {
            tracing::debug!("Using legacy variable {} for {}", fallback_var, primary_var);
        }
        parse_env(fallback_var, default)
    }
}
