// ABOUTME: Robot daemon subcommand
// ABOUTME: Builds the daemon config from env and flags, connects Docker, runs until Ctrl-C

use clap::Args;
use hill_daemon::{Daemon, DaemonConfig};
use hill_sandbox::{ContainerRuntime, DockerRuntime};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args)]
pub struct DaemonArgs {
    /// Robot name used to claim jobs (falls back to HILL_ROBOT)
    #[arg(long)]
    pub robot: Option<String>,
    /// Control plane URL (falls back to HILL_URL)
    #[arg(long)]
    pub url: Option<String>,
    /// Local staging directory for the job in flight
    #[arg(long)]
    pub workspace: Option<PathBuf>,
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
}

impl DaemonArgs {
    fn into_config(self) -> anyhow::Result<DaemonConfig> {
        let mut config = DaemonConfig::from_env()?;
        if let Some(robot) = self.robot {
            config.robot_id = robot;
        }
        if let Some(url) = self.url {
            config.control_plane_url = url;
        }
        if let Some(workspace) = self.workspace {
            config.workspace_dir = workspace;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

pub async fn run_daemon(args: DaemonArgs) -> anyhow::Result<()> {
    let config = args.into_config()?;

    let runtime = DockerRuntime::new()?;
    match runtime.is_available().await {
        Ok(true) => info!("Docker is available"),
        Ok(false) | Err(_) => warn!("Docker is not reachable yet; jobs will fail until it is"),
    }

    let daemon = Daemon::new(config, Arc::new(runtime))?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        hill_cli::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    daemon.run(shutdown_rx).await;
    Ok(())
}
