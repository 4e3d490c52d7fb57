// ABOUTME: Docker runtime implementation for job containers
// ABOUTME: Uses bollard to pull, create, start, inspect, stop, read logs, and remove containers

use crate::runtime::{ContainerConfig, ContainerRuntime, ContainerStatus, Result, RuntimeError};
use async_trait::async_trait;
use bollard::{
    container::{
        Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
        StartContainerOptions, StopContainerOptions,
    },
    errors::Error as BollardError,
    image::CreateImageOptions,
    Docker,
};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info, warn};

const LABEL_PREFIX: &str = "hill.job";

pub struct DockerRuntime {
    client: Docker,
    /// Timeout for image pull operations (default: 10 minutes)
    pull_timeout: Duration,
}

impl DockerRuntime {
    /// Connect to the local Docker daemon with the default pull timeout
    pub fn new() -> Result<Self> {
        Self::with_pull_timeout(Duration::from_secs(600))
    }

    pub fn with_pull_timeout(timeout: Duration) -> Result<Self> {
        let client = Docker::connect_with_defaults()
            .map_err(|e| RuntimeError::ConnectionError(e.to_string()))?;

        Ok(Self::with_client(client, timeout))
    }

    pub fn with_client(client: Docker, pull_timeout: Duration) -> Self {
        Self {
            client,
            pull_timeout,
        }
    }

    fn to_bollard_config(config: &ContainerConfig) -> Config<String> {
        let mut labels = config.labels.clone();
        labels.insert(format!("{}.managed", LABEL_PREFIX), "true".to_string());
        labels.insert(format!("{}.name", LABEL_PREFIX), config.name.clone());

        let binds: Vec<String> = config.volumes.iter().map(|v| v.to_bind()).collect();

        let host_config = bollard::models::HostConfig {
            binds: Some(binds),
            ..Default::default()
        };

        Config {
            image: Some(config.image.clone()),
            cmd: config.command.clone(),
            working_dir: config.working_dir.clone(),
            labels: Some(labels),
            host_config: Some(host_config),
            ..Default::default()
        }
    }

    fn convert_status(state: &str) -> ContainerStatus {
        match state.to_lowercase().as_str() {
            "created" => ContainerStatus::Created,
            "running" => ContainerStatus::Running,
            "paused" => ContainerStatus::Paused,
            "restarting" => ContainerStatus::Running,
            "removing" => ContainerStatus::Removing,
            "exited" => ContainerStatus::Stopped,
            "dead" => ContainerStatus::Dead,
            _ => ContainerStatus::Error(format!("Unknown status: {}", state)),
        }
    }

    fn container_error(container_id: &str, e: BollardError) -> RuntimeError {
        match e {
            BollardError::DockerResponseServerError {
                status_code: 404, ..
            } => RuntimeError::NotFound(container_id.to_string()),
            other => RuntimeError::ContainerError(other.to_string()),
        }
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        match self.client.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(RuntimeError::ImageError(e.to_string())),
        }
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        info!(image = %image, timeout = ?self.pull_timeout, "Pulling image");

        let options = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };

        let stream = self.client.create_image(Some(options), None, None);

        let result = tokio::time::timeout(self.pull_timeout, async {
            let mut stream = stream;
            let mut last_status = String::new();

            while let Some(result) = stream.next().await {
                let info = result.map_err(|e| {
                    RuntimeError::ImageError(format!("Failed to pull image {}: {}", image, e))
                })?;

                if let Some(status) = &info.status {
                    if status != &last_status {
                        debug!("Pull status: {}", status);
                        last_status = status.clone();
                    }
                }
                if let Some(error) = info.error {
                    return Err(RuntimeError::ImageError(format!(
                        "Failed to pull image {}: {}",
                        image, error
                    )));
                }
            }

            Ok(())
        })
        .await;

        match result {
            Ok(Ok(())) => {
                info!(image = %image, "Successfully pulled image");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RuntimeError::ImageError(format!(
                "Timeout pulling image {} after {:?}",
                image, self.pull_timeout
            ))),
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn is_available(&self) -> Result<bool> {
        match self.client.ping().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Docker not available: {}", e);
                Ok(false)
            }
        }
    }

    async fn run(&self, config: &ContainerConfig) -> Result<String> {
        if !self.image_exists(&config.image).await? {
            self.pull_image(&config.image).await?;
        }

        let options = CreateContainerOptions {
            name: config.name.clone(),
            platform: None,
        };

        let container = self
            .client
            .create_container(Some(options), Self::to_bollard_config(config))
            .await
            .map_err(|e| RuntimeError::ContainerError(e.to_string()))?;

        debug!(container_id = %container.id, name = %config.name, "Created container");

        if let Err(e) = self
            .client
            .start_container(&container.id, None::<StartContainerOptions<String>>)
            .await
        {
            // The caller never receives this id
            let cleanup = RemoveContainerOptions {
                force: true,
                v: true,
                ..Default::default()
            };
            if let Err(remove_err) = self
                .client
                .remove_container(&container.id, Some(cleanup))
                .await
            {
                warn!(
                    container_id = %container.id,
                    error = %remove_err,
                    "Failed to remove container after start failure"
                );
            }
            return Err(Self::container_error(&container.id, e));
        }

        info!(container_id = %container.id, image = %config.image, "Container started");
        Ok(container.id)
    }

    async fn status(&self, container_id: &str) -> Result<ContainerStatus> {
        let inspect = self
            .client
            .inspect_container(container_id, None)
            .await
            .map_err(|e| Self::container_error(container_id, e))?;

        let state = inspect.state.as_ref().ok_or_else(|| {
            RuntimeError::ContainerError("Container has no state information".to_string())
        })?;

        Ok(Self::convert_status(
            state
                .status
                .as_ref()
                .map(|s| s.as_ref())
                .unwrap_or("unknown"),
        ))
    }

    async fn stop(&self, container_id: &str, timeout_secs: u64) -> Result<()> {
        info!(container_id = %container_id, timeout_secs, "Stopping container");

        let options = StopContainerOptions {
            t: timeout_secs as i64,
        };

        match self.client.stop_container(container_id, Some(options)).await {
            Ok(()) => Ok(()),
            // Already stopped
            Err(BollardError::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(e) => Err(Self::container_error(container_id, e)),
        }
    }

    async fn logs(&self, container_id: &str) -> Result<String> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: false,
            timestamps: true,
            ..Default::default()
        };

        let mut stream = self.client.logs(container_id, Some(options));
        let mut collected = Vec::new();

        while let Some(chunk) = stream.next().await {
            match chunk.map_err(|e| Self::container_error(container_id, e))? {
                LogOutput::StdOut { message }
                | LogOutput::StdErr { message }
                | LogOutput::Console { message } => collected.extend_from_slice(&message),
                LogOutput::StdIn { .. } => {}
            }
        }

        Ok(String::from_utf8_lossy(&collected).into_owned())
    }

    async fn remove(&self, container_id: &str, force: bool) -> Result<()> {
        info!(container_id = %container_id, force, "Removing container");

        let options = RemoveContainerOptions {
            force,
            v: true,
            ..Default::default()
        };

        self.client
            .remove_container(container_id, Some(options))
            .await
            .map_err(|e| Self::container_error(container_id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::VolumeMount;
    use std::collections::HashMap;

    #[test]
    fn test_container_config_conversion() {
        let config = ContainerConfig {
            image: "alpine:latest".to_string(),
            name: "hill-job_1".to_string(),
            command: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo hello".to_string(),
            ]),
            working_dir: Some("/code".to_string()),
            volumes: vec![
                VolumeMount::rw("/ws/code", "/code"),
                VolumeMount::rw("/ws/output", "/output"),
            ],
            labels: HashMap::from([("hill.job.id".to_string(), "job_1".to_string())]),
        };

        let bollard_config = DockerRuntime::to_bollard_config(&config);

        assert_eq!(bollard_config.image, Some("alpine:latest".to_string()));
        assert_eq!(bollard_config.working_dir, Some("/code".to_string()));
        assert_eq!(bollard_config.cmd, config.command);

        let binds = bollard_config.host_config.unwrap().binds.unwrap();
        assert_eq!(binds, vec!["/ws/code:/code:rw", "/ws/output:/output:rw"]);

        let labels = bollard_config.labels.unwrap();
        assert_eq!(labels.get("hill.job.managed"), Some(&"true".to_string()));
        assert_eq!(labels.get("hill.job.name"), Some(&"hill-job_1".to_string()));
        assert_eq!(labels.get("hill.job.id"), Some(&"job_1".to_string()));
    }

    #[test]
    fn test_convert_status() {
        assert_eq!(DockerRuntime::convert_status("running"), ContainerStatus::Running);
        assert_eq!(DockerRuntime::convert_status("Exited"), ContainerStatus::Stopped);
        assert_eq!(DockerRuntime::convert_status("dead"), ContainerStatus::Dead);
        assert!(DockerRuntime::convert_status("weird").is_terminal());
    }
}
