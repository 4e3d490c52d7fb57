// ABOUTME: Daemon configuration loaded from the environment
// ABOUTME: Robot identity, control plane URL, workspace, and timing knobs

use hill_config::constants::*;
use hill_config::{env_or, parse_env, ConfigError};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub robot_id: String,
    pub control_plane_url: String,
    pub workspace_dir: PathBuf,
    pub poll_interval: Duration,
    /// Host device directory exposed to job containers; `None` disables the bind
    pub device_path: Option<String>,
    pub stop_timeout_secs: u64,
    pub http_timeout: Duration,
    /// Consecutive failed container inspections before supervision gives up
    pub max_inspect_failures: u32,
}

impl DaemonConfig {
    pub fn new(robot_id: impl Into<String>, control_plane_url: impl Into<String>) -> Self {
        Self {
            robot_id: robot_id.into(),
            control_plane_url: control_plane_url.into(),
            workspace_dir: hill_core::workspace_dir(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            device_path: Some(DEFAULT_DEVICE_PATH.to_string()),
            stop_timeout_secs: DEFAULT_STOP_TIMEOUT_SECS,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            max_inspect_failures: DEFAULT_MAX_INSPECT_FAILURES,
        }
    }

    /// Read every setting from the environment. `HILL_ROBOT` is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let robot_id = env_or(HILL_ROBOT, "");
        let mut config = Self::new(robot_id, env_or(HILL_URL, DEFAULT_URL));

        if let Ok(dir) = std::env::var(HILL_WORKSPACE_DIR) {
            if !dir.trim().is_empty() {
                config.workspace_dir = PathBuf::from(dir.trim());
            }
        }

        config.poll_interval =
            Duration::from_millis(parse_env(HILL_POLL_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS)?);

        // Set to an empty string to disable the device bind
        config.device_path = match std::env::var(HILL_DEVICE_PATH) {
            Ok(path) if path.trim().is_empty() => None,
            Ok(path) => Some(path.trim().to_string()),
            Err(_) => Some(DEFAULT_DEVICE_PATH.to_string()),
        };

        config.stop_timeout_secs = parse_env(HILL_STOP_TIMEOUT_SECS, DEFAULT_STOP_TIMEOUT_SECS)?;
        config.http_timeout =
            Duration::from_secs(parse_env(HILL_HTTP_TIMEOUT_SECS, DEFAULT_HTTP_TIMEOUT_SECS)?);
        config.max_inspect_failures =
            parse_env(HILL_MAX_INSPECT_FAILURES, DEFAULT_MAX_INSPECT_FAILURES)?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.robot_id.trim().is_empty() {
            return Err(ConfigError::Missing(HILL_ROBOT.to_string()));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: HILL_POLL_INTERVAL_MS.to_string(),
                value: "0".to_string(),
            });
        }
        if self.max_inspect_failures == 0 {
            return Err(ConfigError::OutOfRange {
                name: HILL_MAX_INSPECT_FAILURES.to_string(),
                value: "0".to_string(),
            });
        }
        if !self.control_plane_url.starts_with("http://")
            && !self.control_plane_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                name: HILL_URL.to_string(),
                value: self.control_plane_url.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DaemonConfig::new("r1", DEFAULT_URL);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.device_path.as_deref(), Some("/dev"));
        assert_eq!(config.stop_timeout_secs, 10);
        assert!(config.workspace_dir.ends_with(".hill/workspace"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_robot() {
        let config = DaemonConfig::new("  ", DEFAULT_URL);
        assert_eq!(
            config.validate(),
            Err(ConfigError::Missing("HILL_ROBOT".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_bad_url_and_zero_interval() {
        let config = DaemonConfig::new("r1", "127.0.0.1:8000");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut config = DaemonConfig::new("r1", DEFAULT_URL);
        config.poll_interval = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));

        let mut config = DaemonConfig::new("r1", DEFAULT_URL);
        config.max_inspect_failures = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { ref name, .. }) if name == "HILL_MAX_INSPECT_FAILURES"
        ));
    }
}
