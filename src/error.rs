use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Errors surfaced to HTTP callers. Corrupt favorites cookies and upstream
/// catalog failures are deliberately not represented here: those degrade to
/// an empty result at the call site instead of failing the request.
#[derive(Debug, PartialEq, Eq)]
pub enum ApiError {
    /// A favorites removal without an ID segment.
    NoId,
    /// An ID that does not parse as an integer.
    InvalidId,
    /// The requested record does not exist upstream.
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NoId => (StatusCode::BAD_REQUEST, "No ID provided".to_string()),
            ApiError::InvalidId => (StatusCode::BAD_REQUEST, "Invalid ID".to_string()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        };
        let body = Json(json!({ "success": false, "error": message }));
        (status, body).into_response()
    }
}
