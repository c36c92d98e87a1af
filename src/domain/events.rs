//! Inbound media provider webhook events.
//!
//! The provider sends `{ "type": "...", "data": { ... } }`. The `type` string is
//! decoded into a closed set of variants, each with its own payload shape.
//! Unknown kinds are kept as [`WebhookEvent::Unrecognized`] so the receiver can
//! acknowledge them without touching state.

use super::video::{lenient_status, VideoStatus};
use serde::Deserialize;

pub const ASSET_CREATED: &str = "video.asset.created";
pub const ASSET_READY: &str = "video.asset.ready";
pub const ASSET_ERRORED: &str = "video.asset.errored";
pub const ASSET_DELETED: &str = "video.asset.deleted";
pub const TRACK_READY: &str = "video.asset.track.ready";
pub const TRACK_ERRORED: &str = "video.asset.track.errored";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaybackId {
    pub id: String,
    #[serde(default)]
    pub policy: Option<String>,
}

/// Payload of the `video.asset.*` events.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssetData {
    /// Provider asset id.
    pub id: Option<String>,
    pub upload_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<VideoStatus>,
    pub playback_ids: Option<Vec<PlaybackId>>,
    /// Duration in seconds.
    pub duration: Option<f64>,
}

impl AssetData {
    pub fn first_playback_id(&self) -> Option<&str> {
        self.playback_ids
            .as_ref()
            .and_then(|ids| ids.first())
            .map(|playback| playback.id.as_str())
    }

    pub fn duration_ms(&self) -> i64 {
        duration_ms(self.duration)
    }
}

/// Payload of the `video.asset.track.*` events.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrackData {
    /// Provider track id.
    pub id: Option<String>,
    /// The asset the track belongs to.
    pub asset_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    AssetCreated(AssetData),
    AssetReady(AssetData),
    AssetErrored(AssetData),
    AssetDeleted(AssetData),
    TrackReady(TrackData),
    TrackErrored(TrackData),
    Unrecognized(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl WebhookEvent {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_slice(body)?;
        let data = envelope.data;

        let event = match envelope.kind.as_str() {
            ASSET_CREATED => WebhookEvent::AssetCreated(serde_json::from_value(data)?),
            ASSET_READY => WebhookEvent::AssetReady(serde_json::from_value(data)?),
            ASSET_ERRORED => WebhookEvent::AssetErrored(serde_json::from_value(data)?),
            ASSET_DELETED => WebhookEvent::AssetDeleted(serde_json::from_value(data)?),
            TRACK_READY => WebhookEvent::TrackReady(serde_json::from_value(data)?),
            TRACK_ERRORED => WebhookEvent::TrackErrored(serde_json::from_value(data)?),
            _ => WebhookEvent::Unrecognized(envelope.kind),
        };
        Ok(event)
    }

    pub fn kind(&self) -> &str {
        match self {
            WebhookEvent::AssetCreated(_) => ASSET_CREATED,
            WebhookEvent::AssetReady(_) => ASSET_READY,
            WebhookEvent::AssetErrored(_) => ASSET_ERRORED,
            WebhookEvent::AssetDeleted(_) => ASSET_DELETED,
            WebhookEvent::TrackReady(_) => TRACK_READY,
            WebhookEvent::TrackErrored(_) => TRACK_ERRORED,
            WebhookEvent::Unrecognized(kind) => kind,
        }
    }
}

/// Seconds reported by the provider to whole milliseconds. Absent means 0.
pub fn duration_ms(seconds: Option<f64>) -> i64 {
    seconds.map(|s| (s * 1000.0).round() as i64).unwrap_or(0)
}
