// ABOUTME: Artifact download endpoints
// ABOUTME: Serves stored code and output archives as raw gzip bytes

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use hill_core::ArtifactKind;

use crate::error::ApiResult;
use crate::AppState;

pub async fn get_code(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    download(&state, &id, ArtifactKind::Code).await
}

pub async fn get_output(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    download(&state, &id, ArtifactKind::Output).await
}

async fn download(state: &AppState, job_id: &str, kind: ArtifactKind) -> ApiResult<Response> {
    let bytes = state.artifacts.get(job_id, kind).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/gzip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}-{}\"", job_id, kind.file_name()),
            ),
        ],
        bytes,
    )
        .into_response())
}
