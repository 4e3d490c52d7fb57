// ABOUTME: Per-robot execution loop
// ABOUTME: Claim, stage, run, supervise with cancellation, collect logs, package output, report

use hill_core::{Job, JobStatus};
use hill_sandbox::{ContainerConfig, ContainerRuntime, RuntimeError, VolumeMount};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::client::{ClientError, ControlPlaneClient};
use crate::config::DaemonConfig;
use crate::workspace::Workspace;
use crate::DaemonError;

/// Container path the job's code is mounted at; also its working directory
pub const CODE_MOUNT: &str = "/code";

/// What happened to one claimed job
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    /// False when the control plane had already cancelled the job and the
    /// collected logs and output were discarded
    pub reported: bool,
}

pub struct Daemon {
    config: DaemonConfig,
    client: ControlPlaneClient,
    runtime: Arc<dyn ContainerRuntime>,
    workspace: Workspace,
}

impl Daemon {
    pub fn new(config: DaemonConfig, runtime: Arc<dyn ContainerRuntime>) -> Result<Self, DaemonError> {
        config.validate()?;
        let client = ControlPlaneClient::new(config.control_plane_url.clone(), config.http_timeout)?;
        let workspace = Workspace::new(config.workspace_dir.clone());

        Ok(Self {
            config,
            client,
            runtime,
            workspace,
        })
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// Poll until `shutdown` flips to true. A job in flight is always finished first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            robot = %self.config.robot_id,
            url = %self.client.base_url(),
            poll_ms = self.config.poll_interval.as_millis() as u64,
            "Daemon started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let busy = match self.run_once().await {
                Ok(Some(outcome)) => {
                    info!(job_id = %outcome.job_id, status = %outcome.status, "Job complete");
                    true
                }
                Ok(None) => false,
                Err(DaemonError::Client(e @ ClientError::Transport(_))) => {
                    warn!(robot = %self.config.robot_id, error = %e, "Control plane unreachable");
                    false
                }
                Err(e) => {
                    error!(robot = %self.config.robot_id, error = %e, "Job attempt failed");
                    false
                }
            };

            if busy {
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(robot = %self.config.robot_id, "Daemon stopped");
    }

    /// One claim attempt; executes the job if one was handed out
    pub async fn run_once(&self) -> Result<Option<JobOutcome>, DaemonError> {
        let Some(job) = self.client.claim(&self.config.robot_id).await? else {
            debug!(robot = %self.config.robot_id, "Queue idle");
            return Ok(None);
        };

        info!(job_id = %job.id, image = %job.container_image, "Claimed job");
        self.execute(job).await.map(Some)
    }

    async fn execute(&self, job: Job) -> Result<JobOutcome, DaemonError> {
        self.stage(&job).await?;

        let container_id = self.runtime.run(&self.container_config(&job)).await?;
        let observed = self.supervise(&job.id, &container_id).await;

        let logs = match self.runtime.logs(&container_id).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Failed to collect container logs");
                String::new()
            }
        };
        if let Err(e) = self.runtime.remove(&container_id, true).await {
            warn!(job_id = %job.id, container_id = %container_id, error = %e, "Failed to remove container");
        }

        // The exit code is deliberately not consulted
        let status = if observed == JobStatus::Cancelled {
            JobStatus::Cancelled
        } else {
            JobStatus::Finished
        };

        let output = self.workspace.pack_output().await?;

        match self.client.report(&job.id, status, &logs, Some(output)).await {
            Ok(reported) => Ok(JobOutcome {
                job_id: reported.id,
                status: reported.status,
                reported: true,
            }),
            Err(e) if e.is_invalid_transition() => {
                let current = self.client.get_job(&job.id).await?;
                if current.status == JobStatus::Cancelled {
                    info!(job_id = %job.id, "Job was cancelled; results discarded");
                    Ok(JobOutcome {
                        job_id: job.id,
                        status: JobStatus::Cancelled,
                        reported: false,
                    })
                } else {
                    Err(e.into())
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn stage(&self, job: &Job) -> Result<(), DaemonError> {
        self.workspace.reset().await?;
        let archive = self.client.download_code(&job.id).await?;
        self.workspace.unpack_code(archive).await?;
        debug!(job_id = %job.id, workspace = %self.workspace.root().display(), "Job staged");
        Ok(())
    }

    pub fn container_config(&self, job: &Job) -> ContainerConfig {
        let mut volumes = vec![
            VolumeMount::rw(self.workspace.code_dir().display().to_string(), CODE_MOUNT),
            VolumeMount::rw(
                self.workspace.output_dir().display().to_string(),
                job.mount_path.clone(),
            ),
        ];
        if let Some(device_path) = &self.config.device_path {
            volumes.push(VolumeMount::rw(device_path.clone(), device_path.clone()));
        }

        ContainerConfig {
            image: job.container_image.clone(),
            name: format!("hill-{}", job.id),
            command: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                job.run_command.clone(),
            ]),
            working_dir: Some(CODE_MOUNT.to_string()),
            volumes,
            labels: HashMap::from([
                ("hill.job.id".to_string(), job.id.clone()),
                ("hill.job.robot".to_string(), self.config.robot_id.clone()),
            ]),
        }
    }

    /// Watch the container until it is terminal, stopping it once the job is
    /// cancelled. Returns the last job status observed on the control plane.
    ///
    /// After `max_inspect_failures` consecutive failed inspections the container
    /// is treated as terminal so the daemon can move on.
    async fn supervise(&self, job_id: &str, container_id: &str) -> JobStatus {
        let mut observed = JobStatus::Running;
        let mut stop_issued = false;
        let mut inspect_failures = 0u32;

        loop {
            match self.runtime.status(container_id).await {
                Ok(status) if status.is_terminal() => {
                    debug!(job_id = %job_id, ?status, "Container terminal");
                    break;
                }
                Ok(_) => inspect_failures = 0,
                Err(RuntimeError::NotFound(_)) => {
                    warn!(job_id = %job_id, container_id = %container_id, "Container disappeared");
                    break;
                }
                Err(e) => {
                    inspect_failures += 1;
                    if inspect_failures >= self.config.max_inspect_failures {
                        warn!(
                            job_id = %job_id,
                            container_id = %container_id,
                            failures = inspect_failures,
                            error = %e,
                            "Giving up on container inspection"
                        );
                        break;
                    }
                    warn!(job_id = %job_id, error = %e, "Failed to inspect container");
                }
            }

            match self.client.get_job(job_id).await {
                Ok(job) => observed = job.status,
                Err(e) => warn!(job_id = %job_id, error = %e, "Failed to refresh job status"),
            }

            if observed == JobStatus::Cancelled && !stop_issued {
                match self
                    .runtime
                    .stop(container_id, self.config.stop_timeout_secs)
                    .await
                {
                    Ok(()) => {
                        info!(job_id = %job_id, "Cancellation requested, container stopped");
                        stop_issued = true;
                    }
                    Err(e) => {
                        warn!(job_id = %job_id, error = %e, "Stop failed, retrying next tick");
                    }
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }

        observed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoopRuntime;

    #[async_trait]
    impl ContainerRuntime for NoopRuntime {
        async fn is_available(&self) -> hill_sandbox::runtime::Result<bool> {
            Ok(true)
        }
        async fn run(&self, _config: &ContainerConfig) -> hill_sandbox::runtime::Result<String> {
            Ok("noop".to_string())
        }
        async fn status(&self, _id: &str) -> hill_sandbox::runtime::Result<hill_sandbox::ContainerStatus> {
            Ok(hill_sandbox::ContainerStatus::Stopped)
        }
        async fn stop(&self, _id: &str, _timeout_secs: u64) -> hill_sandbox::runtime::Result<()> {
            Ok(())
        }
        async fn logs(&self, _id: &str) -> hill_sandbox::runtime::Result<String> {
            Ok(String::new())
        }
        async fn remove(&self, _id: &str, _force: bool) -> hill_sandbox::runtime::Result<()> {
            Ok(())
        }
    }

    fn job(mount_path: &str) -> Job {
        Job {
            id: "job_abc".to_string(),
            created_at: hill_core::parse_timestamp("2024-01-01T00:00:00.000000Z").unwrap(),
            status: JobStatus::Running,
            container_image: "alpine:3.19".to_string(),
            run_command: "python3 run.py && echo done".to_string(),
            mount_path: mount_path.to_string(),
            robot_id: "r1".to_string(),
            logs: String::new(),
            code_artifact_ref: "job_abc/code.tar.gz".to_string(),
            output_artifact_ref: None,
            started_at: None,
            completed_at: None,
        }
    }

    fn daemon(device_path: Option<&str>) -> Daemon {
        let mut config = DaemonConfig::new("r1", "http://127.0.0.1:8000");
        config.workspace_dir = "/srv/hill/workspace".into();
        config.device_path = device_path.map(str::to_string);
        Daemon::new(config, Arc::new(NoopRuntime)).unwrap()
    }

    #[test]
    fn test_container_config_for_job() {
        let daemon = daemon(Some("/dev"));
        let config = daemon.container_config(&job("/results"));

        assert_eq!(config.image, "alpine:3.19");
        assert_eq!(config.name, "hill-job_abc");
        assert_eq!(
            config.command,
            Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                "python3 run.py && echo done".to_string()
            ])
        );
        assert_eq!(config.working_dir.as_deref(), Some("/code"));

        let binds: Vec<String> = config.volumes.iter().map(|v| v.to_bind()).collect();
        assert_eq!(
            binds,
            vec![
                "/srv/hill/workspace/code:/code:rw",
                "/srv/hill/workspace/output:/results:rw",
                "/dev:/dev:rw",
            ]
        );
        assert_eq!(config.labels.get("hill.job.robot"), Some(&"r1".to_string()));
    }

    #[test]
    fn test_device_bind_can_be_disabled() {
        let daemon = daemon(None);
        let config = daemon.container_config(&job("/output"));
        assert_eq!(config.volumes.len(), 2);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = DaemonConfig::new("", "http://127.0.0.1:8000");
        assert!(matches!(
            Daemon::new(config, Arc::new(NoopRuntime)),
            Err(DaemonError::Config(_))
        ));
    }
}
