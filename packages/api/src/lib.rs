// ABOUTME: HTTP control plane for Hill providing REST endpoints and routing
// ABOUTME: Stateless handlers over the job store, activity log, and artifact store

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use hill_storage::{ActivityStorage, ArtifactStore, JobStorage, SqlitePool};
use tower_http::trace::TraceLayer;

pub mod activity_handlers;
pub mod artifacts_handlers;
pub mod error;
pub mod jobs_handlers;
pub mod multipart;
pub mod response;

pub use error::{ApiResult, AppError};
pub use response::ApiResponse;

/// Largest accepted upload (code or output archive)
pub const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Shared handler state; cloning is cheap
#[derive(Clone)]
pub struct AppState {
    pub jobs: JobStorage,
    pub activity: ActivityStorage,
    pub artifacts: ArtifactStore,
}

impl AppState {
    pub fn new(pool: SqlitePool, artifacts: ArtifactStore) -> Self {
        let jobs = JobStorage::new(pool);
        let activity = jobs.activity().clone();
        Self {
            jobs,
            activity,
            artifacts,
        }
    }
}

/// Creates the control plane router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(activity_handlers::health_check))
        .route("/queue", get(jobs_handlers::list_queue))
        .route("/queue/{robot}", get(jobs_handlers::list_robot_queue))
        .route("/history", get(jobs_handlers::list_history))
        .route("/history/{robot}", get(jobs_handlers::list_robot_history))
        .route("/job", post(jobs_handlers::create_job))
        .route(
            "/job/{id}",
            get(jobs_handlers::get_job)
                .put(jobs_handlers::update_job)
                .delete(jobs_handlers::delete_job),
        )
        .route("/pop/{robot}", post(jobs_handlers::pop_job))
        .route("/code/{id}", get(artifacts_handlers::get_code))
        .route("/output/{id}", get(artifacts_handlers::get_output))
        .route("/activity", get(activity_handlers::list_active_robots))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
