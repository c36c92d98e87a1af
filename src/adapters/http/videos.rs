use super::auth::AuthUser;
use super::error::ApiResult;
use super::AppState;
use super::error::ApiError;
use crate::application::videos::{CreatedUpload, MetadataUpdate, VideoError, VideoPage};
use crate::domain::video::{VideoCursor, VideoRecord};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: usize = 5;

/// `?limit=&cursorId=&cursorUpdatedAt=`; both cursor fields or neither.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub cursor_id: Option<Uuid>,
    pub cursor_updated_at: Option<DateTime<Utc>>,
}

impl ListQuery {
    fn cursor(&self) -> Result<Option<VideoCursor>, VideoError> {
        match (self.cursor_id, self.cursor_updated_at) {
            (Some(id), Some(updated_at)) => Ok(Some(VideoCursor { id, updated_at })),
            (None, None) => Ok(None),
            _ => Err(VideoError::BadRequest(
                "cursorId and cursorUpdatedAt go together".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailPrompt {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    pub workflow_run_id: String,
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<(StatusCode, Json<CreatedUpload>)> {
    let created = state.services.videos.create_upload(user.user_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<VideoPage>> {
    let cursor = query.cursor()?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let page = state
        .services
        .videos
        .list(user.user_id, cursor, limit)
        .await?;
    Ok(Json(page))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<VideoRecord>> {
    let video = state.services.videos.get(user.user_id, id).await?;
    Ok(Json(video))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(update): Json<MetadataUpdate>,
) -> ApiResult<Json<VideoRecord>> {
    let video = state
        .services
        .videos
        .update_metadata(user.user_id, id, update)
        .await?;
    Ok(Json(video))
}

pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<VideoRecord>> {
    let video = state.services.videos.remove(user.user_id, id).await?;
    Ok(Json(video))
}

pub async fn restore_thumbnail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<VideoRecord>> {
    let video = state
        .services
        .videos
        .restore_thumbnail(user.user_id, id)
        .await?;
    Ok(Json(video))
}

/// Raw image body; the `Content-Type` header names its format.
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<VideoRecord>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::from(VideoError::BadRequest("Missing Content-Type".to_string()))
        })?;
    let video = state
        .services
        .videos
        .upload_thumbnail(user.user_id, id, body, content_type)
        .await?;
    Ok(Json(video))
}

pub async fn revalidate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<VideoRecord>> {
    let video = state.services.videos.revalidate(user.user_id, id).await?;
    Ok(Json(video))
}

pub async fn generate_title(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WorkflowRun>> {
    let workflow_run_id = state.services.videos.generate_title(user.user_id, id).await?;
    Ok(Json(WorkflowRun { workflow_run_id }))
}

pub async fn generate_description(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WorkflowRun>> {
    let workflow_run_id = state
        .services
        .videos
        .generate_description(user.user_id, id)
        .await?;
    Ok(Json(WorkflowRun { workflow_run_id }))
}

pub async fn generate_thumbnail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ThumbnailPrompt>,
) -> ApiResult<Json<WorkflowRun>> {
    let workflow_run_id = state
        .services
        .videos
        .generate_thumbnail(user.user_id, id, body.prompt)
        .await?;
    Ok(Json(WorkflowRun { workflow_run_id }))
}
