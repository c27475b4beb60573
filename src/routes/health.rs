use axum::response::Json;
use serde_json::json;

/// Health check endpoint handler.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/ping`
/// - **Response**: `{"status":"pong"}` with 200 OK
///
/// Used by load balancers and uptime monitors to verify the service is
/// alive; intentionally does not touch the database or the AI capability.
pub async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "status": "pong" }))
}
