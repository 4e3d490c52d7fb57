// ABOUTME: HTTP request handlers for job lifecycle operations
// ABOUTME: Queue and history listings, submission, status updates, claim, and deletion

use axum::{
    extract::{Multipart, Path, State},
    response::Response,
};
use hill_core::{ArtifactKind, JobStatus, NewJob};
use tracing::{error, info, warn};

use crate::error::{ApiResult, AppError};
use crate::multipart::Form;
use crate::response::ok;
use crate::AppState;

pub const CODE_FIELD: &str = "code_zip";
pub const OUTPUT_FIELD: &str = "output_zip";

pub async fn list_queue(State(state): State<AppState>) -> ApiResult<Response> {
    Ok(ok(state.jobs.list_queue(None).await?))
}

pub async fn list_robot_queue(
    State(state): State<AppState>,
    Path(robot_id): Path<String>,
) -> ApiResult<Response> {
    Ok(ok(state.jobs.list_queue(Some(&robot_id)).await?))
}

pub async fn list_history(State(state): State<AppState>) -> ApiResult<Response> {
    Ok(ok(state.jobs.list_history(None).await?))
}

pub async fn list_robot_history(
    State(state): State<AppState>,
    Path(robot_id): Path<String>,
) -> ApiResult<Response> {
    Ok(ok(state.jobs.list_history(Some(&robot_id)).await?))
}

/// Submit a job: metadata fields plus the code archive
pub async fn create_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let mut form = Form::collect(multipart, &[CODE_FIELD]).await?;

    let mut new_job = NewJob::new(
        form.required_text("container")?,
        form.text("run_command").unwrap_or_default(),
    )
    .with_mount(form.text("mount").unwrap_or_default());
    if let Some(robot) = form.text("robot") {
        new_job = new_job.for_robot(robot.trim());
    }

    let code = form
        .take_file(CODE_FIELD)
        .ok_or_else(|| AppError::validation(format!("missing file '{CODE_FIELD}'")))?;

    let job = state.jobs.create_job(new_job).await?;

    if let Err(e) = state.artifacts.put(&job.id, ArtifactKind::Code, &code).await {
        warn!(job_id = %job.id, error = %e, "Failed to store code artifact, removing job");
        if let Err(cleanup) = state.jobs.delete_job(&job.id).await {
            warn!(job_id = %job.id, error = %cleanup, "Failed to remove job after artifact error");
        }
        return Err(e.into());
    }

    Ok(ok(job))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    Ok(ok(state.jobs.get_job(&id).await?))
}

/// Move a running job to a terminal status.
///
/// Operators use this to cancel; the daemon uses it to report results. An
/// output archive is staged before the transition and only published once the
/// transition wins.
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let mut form = Form::collect(multipart, &[OUTPUT_FIELD]).await?;

    let status: JobStatus = form
        .required_text("status")?
        .parse()
        .map_err(|e: hill_core::ParseStatusError| AppError::validation(e.to_string()))?;
    let logs = form.text("logs").unwrap_or_default().to_string();

    let Some(output) = form.take_file(OUTPUT_FIELD) else {
        let job = state.jobs.report(&id, status, &logs, None).await?;
        return Ok(ok(job));
    };

    // Refuse before touching the artifact store if the transition cannot succeed
    let current = state.jobs.get_job(&id).await?;
    if !current.status.can_transition_to(status) {
        return Err(AppError::InvalidTransition {
            id,
            from: current.status,
            to: status,
        });
    }

    // Concurrent reports each stage privately; only the CAS winner publishes
    let staged = state.artifacts.stage(&id, ArtifactKind::Output, &output).await?;
    let output_ref = staged.artifact_ref();

    match state.jobs.report(&id, status, &logs, Some(&output_ref)).await {
        Ok(job) => {
            if let Err(e) = staged.commit().await {
                error!(job_id = %id, error = %e, "Job reported but output artifact was not published");
                return Err(e.into());
            }
            Ok(ok(job))
        }
        Err(e) => {
            if let Err(cleanup) = staged.discard().await {
                warn!(job_id = %id, error = %cleanup, "Failed to remove rejected output artifact");
            }
            Err(e.into())
        }
    }
}

pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let job = state.jobs.delete_job(&id).await?;

    if let Err(e) = state.artifacts.remove_all(&job.id).await {
        warn!(job_id = %job.id, error = %e, "Job deleted but artifacts remain");
    }

    Ok(ok(job))
}

/// Claim the next job for a robot; `data` is null when nothing is queued
pub async fn pop_job(
    State(state): State<AppState>,
    Path(robot_id): Path<String>,
) -> ApiResult<Response> {
    let claimed = state.jobs.claim(&robot_id).await?;
    if let Some(job) = &claimed {
        info!(job_id = %job.id, robot = %robot_id, "Job handed to robot");
    }
    Ok(ok(claimed))
}
