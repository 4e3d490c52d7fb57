// ABOUTME: Core types, constants, and utilities for Hill
// ABOUTME: Foundational package shared by the control plane, the daemon, and the CLI

pub mod constants;
pub mod types;
pub mod utils;

// Re-export main types
pub use types::{ArtifactKind, Job, JobStatus, NewJob, ParseStatusError};

// Re-export constants
pub use constants::{artifacts_dir, database_file, hill_dir, workspace_dir, DEFAULT_MOUNT};

// Re-export utilities
pub use utils::{format_timestamp, generate_job_id, parse_timestamp};
