// ABOUTME: Storage layer for the job queue
// ABOUTME: Create/list/delete jobs plus the atomic claim and the terminal report transition

use chrono::Utc;
use hill_core::{format_timestamp, generate_job_id, parse_timestamp, ArtifactKind, Job, JobStatus, NewJob};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::activity::ActivityStorage;
use crate::{Result, StorageError};

const JOB_COLUMNS: &str = "id, created_at, status, container_image, run_command, mount_path, \
     robot_id, logs, code_artifact_ref, output_artifact_ref, started_at, completed_at";

#[derive(Clone)]
pub struct JobStorage {
    pool: SqlitePool,
    activity: ActivityStorage,
}

impl JobStorage {
    pub fn new(pool: SqlitePool) -> Self {
        let activity = ActivityStorage::new(pool.clone());
        Self { pool, activity }
    }

    pub fn activity(&self) -> &ActivityStorage {
        &self.activity
    }

    pub async fn create_job(&self, new_job: NewJob) -> Result<Job> {
        if new_job.container_image.trim().is_empty() {
            return Err(StorageError::InvalidInput(
                "container image must not be empty".to_string(),
            ));
        }

        let id = generate_job_id();
        let created_at = Utc::now();

        let query = format!(
            r#"
            INSERT INTO jobs (id, created_at, status, container_image, run_command,
                              mount_path, robot_id, logs, code_artifact_ref)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '', ?8)
            RETURNING {JOB_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(&id)
            .bind(format_timestamp(&created_at))
            .bind(JobStatus::Queued.as_str())
            .bind(&new_job.container_image)
            .bind(&new_job.run_command)
            .bind(&new_job.mount_path)
            .bind(new_job.robot_id.trim())
            .bind(ArtifactKind::Code.artifact_ref(&id))
            .fetch_one(&self.pool)
            .await?;

        let job = row_to_job(&row)?;
        info!(job_id = %job.id, robot = %job.robot_id, image = %job.container_image, "Job queued");
        Ok(job)
    }

    pub async fn get_job(&self, id: &str) -> Result<Job> {
        let query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_job(&row),
            None => Err(StorageError::NotFound(id.to_string())),
        }
    }

    pub async fn delete_job(&self, id: &str) -> Result<Job> {
        let query = format!("DELETE FROM jobs WHERE id = ?1 RETURNING {JOB_COLUMNS}");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                info!(job_id = %id, "Job deleted");
                row_to_job(&row)
            }
            None => Err(StorageError::NotFound(id.to_string())),
        }
    }

    /// Queued jobs, oldest first. With a robot, only jobs targeted at it.
    pub async fn list_queue(&self, robot_id: Option<&str>) -> Result<Vec<Job>> {
        self.list_by_status(true, robot_id).await
    }

    /// Non-queued jobs, newest first. With a robot, only jobs assigned to it.
    pub async fn list_history(&self, robot_id: Option<&str>) -> Result<Vec<Job>> {
        self.list_by_status(false, robot_id).await
    }

    async fn list_by_status(&self, queued: bool, robot_id: Option<&str>) -> Result<Vec<Job>> {
        let mut query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE ");
        query.push_str(if queued {
            "status = ?1"
        } else {
            "status != ?1"
        });
        if robot_id.is_some() {
            query.push_str(" AND robot_id = ?2");
        }
        query.push_str(if queued {
            " ORDER BY created_at ASC, rowid ASC"
        } else {
            " ORDER BY created_at DESC, rowid DESC"
        });

        let mut q = sqlx::query(&query).bind(JobStatus::Queued.as_str());
        if let Some(robot) = robot_id {
            q = q.bind(robot);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_job).collect()
    }

    /// Atomically hand the oldest eligible queued job to `robot_id`.
    ///
    /// Eligible means targeted at this robot or unscoped (empty robot). The
    /// select and the Queued -> Running transition are one statement with a
    /// compare-and-set on `status`, so two concurrent claims can never both
    /// take the same row. Every attempt records an activity ping first.
    pub async fn claim(&self, robot_id: &str) -> Result<Option<Job>> {
        let robot_id = robot_id.trim();
        if robot_id.is_empty() {
            return Err(StorageError::InvalidInput(
                "robot id must not be empty".to_string(),
            ));
        }

        self.activity.record_ping(robot_id).await?;

        let query = format!(
            r#"
            UPDATE jobs
            SET status = ?1, robot_id = ?2, started_at = ?3
            WHERE id = (
                SELECT id FROM jobs
                WHERE status = ?4 AND (robot_id = ?2 OR robot_id = '')
                ORDER BY created_at ASC, rowid ASC
                LIMIT 1
            )
            AND status = ?4
            RETURNING {JOB_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(JobStatus::Running.as_str())
            .bind(robot_id)
            .bind(format_timestamp(&Utc::now()))
            .bind(JobStatus::Queued.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let job = row_to_job(&row)?;
                info!(job_id = %job.id, robot = %robot_id, "Job claimed");
                Ok(Some(job))
            }
            None => {
                debug!(robot = %robot_id, "No queued job to claim");
                Ok(None)
            }
        }
    }

    /// Move a running job to a terminal status, recording logs and the output ref.
    ///
    /// Fails with `NotFound` for an unknown id and `InvalidTransition` when the
    /// job is not Running or `status` is not terminal. Nothing is written on failure.
    pub async fn report(
        &self,
        id: &str,
        status: JobStatus,
        logs: &str,
        output_artifact_ref: Option<&str>,
    ) -> Result<Job> {
        if !JobStatus::Running.can_transition_to(status) {
            let current = self.get_job(id).await?;
            return Err(StorageError::InvalidTransition {
                id: id.to_string(),
                from: current.status,
                to: status,
            });
        }

        let query = format!(
            r#"
            UPDATE jobs
            SET status = ?1,
                logs = ?2,
                output_artifact_ref = COALESCE(?3, output_artifact_ref),
                completed_at = ?4
            WHERE id = ?5 AND status = ?6
            RETURNING {JOB_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(status.as_str())
            .bind(logs)
            .bind(output_artifact_ref)
            .bind(format_timestamp(&Utc::now()))
            .bind(id)
            .bind(JobStatus::Running.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let job = row_to_job(&row)?;
                info!(job_id = %job.id, status = %job.status, "Job reported");
                Ok(job)
            }
            None => {
                let current = self.get_job(id).await?;
                Err(StorageError::InvalidTransition {
                    id: id.to_string(),
                    from: current.status,
                    to: status,
                })
            }
        }
    }
}

fn row_to_job(row: &SqliteRow) -> Result<Job> {
    let timestamp = |column: &str| -> Result<Option<chrono::DateTime<Utc>>> {
        match row.try_get::<Option<String>, _>(column)? {
            Some(raw) => parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| StorageError::InvalidTimestamp(column.to_string())),
            None => Ok(None),
        }
    };

    let status: String = row.try_get("status")?;

    Ok(Job {
        id: row.try_get("id")?,
        created_at: timestamp("created_at")?
            .ok_or_else(|| StorageError::InvalidTimestamp("created_at".to_string()))?,
        status: status.parse()?,
        container_image: row.try_get("container_image")?,
        run_command: row.try_get("run_command")?,
        mount_path: row.try_get("mount_path")?,
        robot_id: row.try_get("robot_id")?,
        logs: row.try_get("logs")?,
        code_artifact_ref: row.try_get("code_artifact_ref")?,
        output_artifact_ref: row.try_get("output_artifact_ref")?,
        started_at: timestamp("started_at")?,
        completed_at: timestamp("completed_at")?,
    })
}
