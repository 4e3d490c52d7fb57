// ABOUTME: Job records, lifecycle status, and activity pings
// ABOUTME: Shared wire and storage representation for every Hill package

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::DEFAULT_MOUNT;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid job status: {0}")]
pub struct ParseStatusError(pub String);

/// Lifecycle of a job. Transitions only move forward:
/// `Queued -> Running -> {Finished, Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Finished,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }

    /// Whether `self -> next` is a legal edge of the job state machine
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Running, Self::Finished)
                | (Self::Running, Self::Cancelled)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "finished" => Ok(Self::Finished),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub status: JobStatus,
    pub container_image: String,
    pub run_command: String,
    pub mount_path: String,
    /// Assignment target. Empty while an unscoped job is queued.
    pub robot_id: String,
    pub logs: String,
    pub code_artifact_ref: String,
    pub output_artifact_ref: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Submission payload; the store assigns id, timestamps, and artifact refs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewJob {
    pub container_image: String,
    pub run_command: String,
    #[serde(default = "default_mount")]
    pub mount_path: String,
    #[serde(default)]
    pub robot_id: String,
}

fn default_mount() -> String {
    DEFAULT_MOUNT.to_string()
}

impl NewJob {
    pub fn new(container_image: impl Into<String>, run_command: impl Into<String>) -> Self {
        Self {
            container_image: container_image.into(),
            run_command: run_command.into(),
            mount_path: default_mount(),
            robot_id: String::new(),
        }
    }

    pub fn for_robot(mut self, robot_id: impl Into<String>) -> Self {
        self.robot_id = robot_id.into();
        self
    }

    pub fn with_mount(mut self, mount_path: impl Into<String>) -> Self {
        let mount_path = mount_path.into();
        if !mount_path.trim().is_empty() {
            self.mount_path = mount_path;
        }
        self
    }
}

/// The two blobs a job carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Code,
    Output,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Output => "output",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Code => "code.tar.gz",
            Self::Output => "output.tar.gz",
        }
    }

    /// Storage key for this artifact of `job_id`
    pub fn artifact_ref(&self, job_id: &str) -> String {
        format!("{}/{}", job_id, self.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Finished,
            JobStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert_eq!("Cancelled".parse::<JobStatus>().unwrap(), JobStatus::Cancelled);
        assert!("failed".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_transitions_only_move_forward() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Finished));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Cancelled));

        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Finished));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::Finished.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Cancelled.can_transition_to(JobStatus::Cancelled));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }

    #[test]
    fn test_new_job_defaults() {
        let job = NewJob::new("alpine", "echo hi");
        assert_eq!(job.mount_path, DEFAULT_MOUNT);
        assert!(job.robot_id.is_empty());

        let job = job.for_robot("r1").with_mount("  ");
        assert_eq!(job.robot_id, "r1");
        assert_eq!(job.mount_path, DEFAULT_MOUNT);
    }

    #[test]
    fn test_artifact_refs_are_keyed_by_job() {
        assert_eq!(ArtifactKind::Code.artifact_ref("job_1"), "job_1/code.tar.gz");
        assert_eq!(
            ArtifactKind::Output.artifact_ref("job_1"),
            "job_1/output.tar.gz"
        );
    }
}
