// ABOUTME: Subcommand modules for the hill binary
// ABOUTME: Operator commands talk to the control plane; daemon runs the robot loop

pub mod daemon;
pub mod jobs;

use hill_config::constants::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_URL, HILL_URL};
use hill_daemon::ControlPlaneClient;
use serde::Serialize;
use std::time::Duration;

/// `--url`, then `HILL_URL`, then the local default
pub fn control_plane_url(flag: Option<String>) -> String {
    flag.unwrap_or_else(|| hill_config::env_or(HILL_URL, DEFAULT_URL))
}

pub fn client(url: Option<String>) -> anyhow::Result<ControlPlaneClient> {
    Ok(ControlPlaneClient::new(
        control_plane_url(url),
        Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
    )?)
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
