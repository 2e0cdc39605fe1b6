use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::{ApiResponse, AppError};
use crate::services::HealthStatus;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AppInfo {
    pub app_name: String,
    pub app_version: String,
}

/// GET /
pub async fn root(State(state): State<AppState>) -> Json<ApiResponse<AppInfo>> {
    Json(ApiResponse::success(AppInfo {
        app_name: state.config.app.name.clone(),
        app_version: state.config.app.version.clone(),
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let status = state.health.check().await;
    Json(ApiResponse::success_with_message(
        "success check service health",
        status,
    ))
}

/// Fallback for unknown routes
pub async fn not_found() -> AppError {
    AppError::ResourceNotFound("route".to_string())
}
