use crate::application::generation::JobError;
use crate::application::videos::VideoError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Error type for the JSON endpoints. Renders `{ "error", "code" }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Video(#[from] VideoError),

    #[error(transparent)]
    Job(#[from] JobError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),

            ApiError::Video(err) => match err {
                VideoError::NotFound => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "Video not found".to_string(),
                ),
                VideoError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
                VideoError::Upstream(msg) => {
                    tracing::error!(error = %msg, "video operation failed");
                    internal()
                }
            },

            ApiError::Job(err) => match err {
                JobError::NotFound => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "Video not found".to_string(),
                ),
                JobError::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
                }
                JobError::TranscriptUnavailable
                | JobError::EmptyTranscript
                | JobError::EmptyResult => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "UNPROCESSABLE",
                    err.to_string(),
                ),
                JobError::Upstream(msg) => {
                    tracing::error!(error = %msg, "generation job failed");
                    internal()
                }
            },
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
