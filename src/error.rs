//! Request-level error taxonomy and the mapping to HTTP responses
//!
//! Every failure a handler can hit is caught here and turned into one of a
//! closed set of status/body shapes. Store and capability failures keep
//! their full detail in the server logs; the caller only ever sees the
//! generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No valid session behind the request
    #[error("authentication required")]
    Unauthenticated,

    /// Missing or malformed prompt / form fields
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Declared upload media type is not an accepted image type
    #[error("unsupported file type")]
    UnsupportedFileType,

    /// Multipart body carried no file field
    #[error("no file uploaded")]
    NoFile,

    /// I/O failure while staging an upload
    #[error("upload failed")]
    Upload(#[source] std::io::Error),

    /// Gemini call failed for a text prompt
    #[error("text generation failed")]
    Generation,

    /// Gemini call failed for an image analysis
    #[error("image analysis failed")]
    Analysis,

    /// Registration against an email that already has a User
    #[error("email already registered")]
    EmailTaken,

    /// Login with a known email but the wrong password
    #[error("incorrect password")]
    WrongPassword,

    /// Login against an email with no User
    #[error("user not found")]
    UserNotFound,

    /// Credential or session store unreachable, or a constraint we did not
    /// expect to trip
    #[error("store failure")]
    Store(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "error": "Authentication required" }),
            ),
            ApiError::InvalidInput(reason) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": reason }),
            ),
            ApiError::UnsupportedFileType => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": "Invalid file type" }),
            ),
            ApiError::NoFile => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": "No image uploaded" }),
            ),
            ApiError::Upload(err) => {
                tracing::error!("Upload staging failed: {}", err);
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "success": false, "error": "File upload failed" }),
                )
            }
            ApiError::Generation => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": "Failed to generate response" }),
            ),
            ApiError::Analysis => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": "Failed to analyze image" }),
            ),
            ApiError::EmailTaken => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": "Email already exists. Try logging in." }),
            ),
            ApiError::WrongPassword => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": "Incorrect password" }),
            ),
            ApiError::UserNotFound => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "error": "User not found" }),
            ),
            ApiError::Store(err) => {
                tracing::error!("Store failure: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": "Server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unauthenticated_maps_to_401_with_fixed_body() {
        let (status, body) = body_json(ApiError::Unauthenticated).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Authentication required");
    }

    #[tokio::test]
    async fn unsupported_file_type_maps_to_400() {
        let (status, body) = body_json(ApiError::UnsupportedFileType).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid file type");
    }

    #[tokio::test]
    async fn capability_failures_map_to_500_without_detail() {
        let (status, body) = body_json(ApiError::Analysis).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to analyze image");
        assert!(body.get("details").is_none());

        let (status, body) = body_json(ApiError::Generation).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to generate response");
    }

    #[tokio::test]
    async fn store_failure_hides_internal_detail() {
        let err = ApiError::Store(anyhow::anyhow!("pool exhausted at 10.0.0.3:5432"));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Server error");
        assert!(!body.to_string().contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn login_failures_distinguish_unknown_user_from_bad_password() {
        let (status, _) = body_json(ApiError::UserNotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = body_json(ApiError::WrongPassword).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Incorrect password");
    }
}
