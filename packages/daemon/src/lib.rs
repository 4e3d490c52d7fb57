// ABOUTME: Execution daemon for Hill robots
// ABOUTME: Control plane client, workspace staging, and the supervise loop around the container runtime

pub mod client;
pub mod config;
pub mod daemon;
pub mod workspace;

pub use client::{ClientError, ClientResult, ControlPlaneClient};
pub use config::DaemonConfig;
pub use daemon::{Daemon, JobOutcome, CODE_MOUNT};
pub use workspace::{Workspace, WorkspaceError};

use hill_config::ConfigError;
use hill_sandbox::RuntimeError;
use thiserror::Error;

/// Failure of one job attempt; the loop logs it and keeps polling
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error("Container runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}
