//! Inbound endpoint for media provider events. Responses are plain text.

use super::AppState;
use crate::application::webhook::WebhookError;
use crate::domain::events::WebhookEvent;
use crate::domain::signature::SIGNATURE_HEADER;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{error, info, warn};

pub async fn receive(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        return (StatusCode::UNAUTHORIZED, "No signature found").into_response();
    };

    if let Err(e) = state.verifier.verify(signature, &body) {
        warn!(error = %e, "rejected webhook signature");
        return (StatusCode::UNAUTHORIZED, "Invalid signature").into_response();
    }

    let event = match WebhookEvent::parse(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "undecodable webhook payload");
            return (StatusCode::BAD_REQUEST, "Invalid payload").into_response();
        }
    };

    let kind = event.kind().to_string();
    match state.services.webhooks.handle(event).await {
        Ok(()) => {
            info!(kind = %kind, "webhook processed");
            (StatusCode::OK, "Webhook received").into_response()
        }
        Err(e) => {
            let status = match &e {
                WebhookError::MissingUploadId
                | WebhookError::MissingAssetId
                | WebhookError::MissingPlaybackId => StatusCode::BAD_REQUEST,
                WebhookError::UnknownVideo => StatusCode::NOT_FOUND,
                WebhookError::Relocation(_) => StatusCode::INTERNAL_SERVER_ERROR,
                WebhookError::Repository(msg) => {
                    error!(kind = %kind, error = %msg, "webhook update failed");
                    return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update video")
                        .into_response();
                }
            };
            warn!(kind = %kind, %status, error = %e, "webhook rejected");
            (status, e.to_string()).into_response()
        }
    }
}
