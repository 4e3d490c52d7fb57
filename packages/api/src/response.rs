// ABOUTME: Shared API response envelope
// ABOUTME: Every JSON endpoint answers with {success, data, error}

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// `200 OK` with `data` in the envelope
pub fn ok<T: Serialize>(data: T) -> axum::response::Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}
