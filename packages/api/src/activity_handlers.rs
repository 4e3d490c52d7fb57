// ABOUTME: Robot activity and service health endpoints
// ABOUTME: Lists robots seen within a window and answers health checks

use axum::{
    extract::{Query, State},
    response::Response,
    Json,
};
use hill_config::constants::DEFAULT_ACTIVITY_WINDOW_SECS;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiResult, AppError};
use crate::response::ok;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub seconds_since_last_ping: Option<i64>,
}

pub async fn list_active_robots(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Response> {
    let window = query
        .seconds_since_last_ping
        .unwrap_or(DEFAULT_ACTIVITY_WINDOW_SECS);
    if window < 0 {
        return Err(AppError::validation(
            "seconds_since_last_ping must not be negative",
        ));
    }

    Ok(ok(state.activity.active_robots(window).await?))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "hill"
    }))
}
