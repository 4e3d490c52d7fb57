// ABOUTME: Control plane server configuration
// ABOUTME: Bind address, data directory, database URL, and CORS origin from env and flags

use hill_config::constants::*;
use hill_config::{env_or, parse_env_with_fallback, ConfigError};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Overrides the database file under `data_dir` when set
    pub database_url: Option<String>,
    /// Single allowed origin; `None` means permissive CORS
    pub cors_origin: Option<String>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: hill_core::hill_dir(),
            database_url: None,
            cors_origin: None,
        }
    }
}

impl ServeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_env_with_fallback(HILL_PORT, PORT, DEFAULT_PORT)?;
        if port == 0 {
            return Err(ConfigError::OutOfRange {
                name: HILL_PORT.to_string(),
                value: port.to_string(),
            });
        }

        let data_dir = match std::env::var(HILL_DATA_DIR) {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
            _ => hill_core::hill_dir(),
        };

        Ok(Self {
            host: env_or(HILL_HOST, DEFAULT_HOST),
            port,
            data_dir,
            database_url: optional_env(HILL_DATABASE_URL),
            cors_origin: optional_env(HILL_CORS_ORIGIN),
        })
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite:{}", self.data_dir.join("hill.db").display()))
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.data_dir.join("artifacts")
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                name: HILL_HOST.to_string(),
                value: self.host.clone(),
            })
    }
}

fn optional_env(var_name: &str) -> Option<String> {
    std::env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_database_defaults_to_data_dir() {
        let config = ServeConfig {
            data_dir: PathBuf::from("/var/lib/hill"),
            ..ServeConfig::default()
        };

        assert_eq!(config.database_url(), "sqlite:/var/lib/hill/hill.db");
        assert_eq!(config.artifacts_dir(), PathBuf::from("/var/lib/hill/artifacts"));
    }

    #[test]
    fn test_explicit_database_url_wins() {
        let config = ServeConfig {
            database_url: Some("sqlite::memory:".to_string()),
            ..ServeConfig::default()
        };
        assert_eq!(config.database_url(), "sqlite::memory:");
    }

    #[test]
    fn test_socket_addr() {
        let config = ServeConfig::default();
        assert_eq!(
            config.socket_addr().unwrap(),
            "127.0.0.1:8000".parse::<SocketAddr>().unwrap()
        );

        let config = ServeConfig {
            host: "not a host".to_string(),
            ..ServeConfig::default()
        };
        assert!(matches!(
            config.socket_addr(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
