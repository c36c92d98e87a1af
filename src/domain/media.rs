//! Media provider resources and the public URLs derived from them.

use super::events::duration_ms;
use super::video::VideoStatus;
use serde::{Deserialize, Serialize};

pub const IMAGE_HOST: &str = "https://image.mux.com";
pub const STREAM_HOST: &str = "https://stream.mux.com";

/// Language of the generated subtitle track used as transcript.
pub const TRANSCRIPT_LANGUAGE: &str = "en";

/// Temporary still image for a ready asset.
pub fn thumbnail_url(playback_id: &str) -> String {
    format!("{}/{}/thumbnail.jpg", IMAGE_HOST, playback_id)
}

/// Temporary animated preview for a ready asset.
pub fn preview_url(playback_id: &str) -> String {
    format!("{}/{}/animated.gif", IMAGE_HOST, playback_id)
}

/// Plain-text rendition of a generated subtitle track.
pub fn transcript_url(playback_id: &str, track_id: &str) -> String {
    format!("{}/{}/text/{}.txt", STREAM_HOST, playback_id, track_id)
}

/// A direct upload slot handed out by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectUpload {
    pub id: String,
    /// Where the client sends the file. Only present while the upload is open.
    pub url: Option<String>,
    /// Set once the provider has created an asset from the upload.
    pub asset_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetTrack {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub language_code: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAsset {
    pub id: String,
    pub status: Option<VideoStatus>,
    pub duration: Option<f64>,
    #[serde(default)]
    pub playback_ids: Vec<String>,
    #[serde(default)]
    pub tracks: Vec<AssetTrack>,
}

impl ProviderAsset {
    pub fn duration_ms(&self) -> i64 {
        duration_ms(self.duration)
    }

    /// The generated English transcript track, when exactly one complete
    /// candidate exists.
    pub fn transcript_track(&self) -> Result<(String, String), usize> {
        let candidates: Vec<&AssetTrack> = self
            .tracks
            .iter()
            .filter(|track| {
                track.kind.as_deref() == Some("text")
                    && track.language_code.as_deref() == Some(TRANSCRIPT_LANGUAGE)
            })
            .collect();

        match candidates.as_slice() {
            [track] => match (&track.id, &track.status) {
                (Some(id), Some(status)) => Ok((id.clone(), status.clone())),
                _ => Err(1),
            },
            other => Err(other.len()),
        }
    }
}
