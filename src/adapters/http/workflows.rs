//! Job endpoints invoked by an external workflow runner.

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::domain::jobs::{GenerationKind, JobPayload};
use crate::domain::video::VideoRecord;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use tracing::info;

pub async fn run(
    State(state): State<AppState>,
    Path(kind): Path<GenerationKind>,
    headers: HeaderMap,
    Json(payload): Json<JobPayload>,
) -> ApiResult<Json<VideoRecord>> {
    // The route is only mounted with a token, so a missing one is a
    // misconfiguration rather than an open door.
    let token = state
        .workflow_token
        .as_ref()
        .ok_or_else(|| ApiError::Unauthorized("Workflow endpoints are disabled".into()))?;
    token.authorize(&headers)?;

    info!(kind = kind.as_str(), video_id = %payload.video_id, "running workflow job");
    let video = state.services.generation.run(kind, &payload).await?;
    Ok(Json(video))
}
