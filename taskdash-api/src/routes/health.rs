/// Service endpoints: liveness message, health check and the JSON 404
///
/// # Endpoints
///
/// - `GET /` - `{"message": "API is running"}`
/// - `GET /health` - server and database status
/// - any unknown route - 404 `{"error": "not_found", "message": "Route not found", "path": ...}`

use crate::app::AppState;
use axum::{extract::State, http::StatusCode, http::Uri, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use taskdash_shared::db::pool::health_check as db_health_check;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,
}

/// Root liveness message
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "API is running" }))
}

/// Health check handler
///
/// Always answers 200; a database outage shows up as `"status": "degraded"`.
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected"
/// }
/// ```
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = match db_health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
    })
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "message": "Route not found",
            "path": uri.path(),
        })),
    )
}
