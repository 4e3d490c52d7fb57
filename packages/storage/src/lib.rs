// ABOUTME: Data layer and persistence for Hill
// ABOUTME: SQLite job store with atomic claim, robot activity log, and filesystem artifacts

pub mod activity;
pub mod artifacts;
pub mod db;
pub mod jobs;

pub use activity::ActivityStorage;
pub use artifacts::{ArtifactStore, StagedArtifact};
pub use db::{connect, connect_in_memory, connect_path};
pub use jobs::JobStorage;
pub use sqlx::SqlitePool;

use hill_core::{JobStatus, ParseStatusError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Job not found: {0}")]
    NotFound(String),
    #[error("Invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },
    #[error(transparent)]
    InvalidStatus(#[from] ParseStatusError),
    #[error("Invalid timestamp in column {0}")]
    InvalidTimestamp(String),
    #[error("Artifact missing: {0}")]
    ArtifactMissing(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;
