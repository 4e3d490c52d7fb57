// ABOUTME: Runtime trait and shared container types
// ABOUTME: Backends implement create/start, inspect, stop, log collection, and removal

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Container error: {0}")]
    ContainerError(String),

    #[error("Container not found: {0}")]
    NotFound(String),

    #[error("Image error: {0}")]
    ImageError(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Everything needed to start one job container
#[derive(Debug, Clone, Default)]
pub struct ContainerConfig {
    pub image: String,
    pub name: String,
    pub command: Option<Vec<String>>,
    pub working_dir: Option<String>,
    pub volumes: Vec<VolumeMount>,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub host_path: String,
    pub container_path: String,
    pub readonly: bool,
}

impl VolumeMount {
    pub fn rw(host_path: impl Into<String>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            readonly: false,
        }
    }

    /// Docker bind syntax, `host:container:mode`
    pub fn to_bind(&self) -> String {
        format!(
            "{}:{}:{}",
            self.host_path,
            self.container_path,
            if self.readonly { "ro" } else { "rw" }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Removing,
    Stopped,
    Dead,
    Error(String),
}

impl ContainerStatus {
    /// No further progress will happen without outside intervention
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Dead | Self::Error(_))
    }
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check if the backend daemon is reachable
    async fn is_available(&self) -> Result<bool>;

    /// Pull the image if needed, then create and start a detached container.
    /// Returns the container id.
    async fn run(&self, config: &ContainerConfig) -> Result<String>;

    async fn status(&self, container_id: &str) -> Result<ContainerStatus>;

    /// Ask the container to stop, killing it after `timeout_secs`
    async fn stop(&self, container_id: &str, timeout_secs: u64) -> Result<()>;

    /// Complete stdout and stderr so far, interleaved, one timestamp per line
    async fn logs(&self, container_id: &str) -> Result<String>;

    async fn remove(&self, container_id: &str, force: bool) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(ContainerStatus::Stopped.is_terminal());
        assert!(ContainerStatus::Dead.is_terminal());
        assert!(ContainerStatus::Error("boom".to_string()).is_terminal());

        assert!(!ContainerStatus::Created.is_terminal());
        assert!(!ContainerStatus::Running.is_terminal());
        assert!(!ContainerStatus::Paused.is_terminal());
        assert!(!ContainerStatus::Removing.is_terminal());
    }

    #[test]
    fn test_volume_bind_syntax() {
        let mut mount = VolumeMount::rw("/home/hill/workspace/code", "/code");
        assert_eq!(mount.to_bind(), "/home/hill/workspace/code:/code:rw");

        mount.readonly = true;
        assert_eq!(mount.to_bind(), "/home/hill/workspace/code:/code:ro");
    }
}
