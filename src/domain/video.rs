//! Video record and the provider-driven status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Title given to a record before the owner (or a generation job) names it.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Processing status as reported by the media provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Waiting,
    Preparing,
    #[serde(alias = "processing-variants")]
    ProcessingVariants,
    Ready,
    Errored,
    Deleted,
}

impl VideoStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VideoStatus::Waiting => "waiting",
            VideoStatus::Preparing => "preparing",
            VideoStatus::ProcessingVariants => "processing_variants",
            VideoStatus::Ready => "ready",
            VideoStatus::Errored => "errored",
            VideoStatus::Deleted => "deleted",
        }
    }

    /// Status named by a provider string, if it is one we track.
    pub fn from_provider(value: &str) -> Option<Self> {
        match value {
            "waiting" => Some(VideoStatus::Waiting),
            "preparing" => Some(VideoStatus::Preparing),
            "processing_variants" | "processing-variants" => Some(VideoStatus::ProcessingVariants),
            "ready" => Some(VideoStatus::Ready),
            "errored" => Some(VideoStatus::Errored),
            "deleted" => Some(VideoStatus::Deleted),
            _ => None,
        }
    }

    /// Whether `self -> next` is part of the expected lifecycle.
    ///
    /// Writes are never rejected on this basis; callers only log transitions
    /// that fall outside the table. Re-applying the same status is allowed so
    /// redelivered events stay quiet.
    pub fn allows_transition_to(self, next: VideoStatus) -> bool {
        use VideoStatus::*;

        if self == next || next == Deleted {
            return true;
        }
        match self {
            Waiting => matches!(next, Preparing | ProcessingVariants | Ready | Errored),
            Preparing => matches!(next, ProcessingVariants | Ready | Errored),
            ProcessingVariants => matches!(next, Ready | Errored),
            Ready | Errored | Deleted => false,
        }
    }
}

/// Deserializes an optional provider status. A status outside
/// [`VideoStatus`] is logged and read as absent, so it leaves the stored
/// status alone instead of failing the whole payload.
pub fn lenient_status<'de, D>(deserializer: D) -> Result<Option<VideoStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        let status = VideoStatus::from_provider(&value);
        if status.is_none() {
            tracing::warn!(status = %value, "ignoring unknown provider status");
        }
        status
    }))
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

/// An object held in platform storage: the key used to delete it and the
/// durable URL clients load it from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub category_id: Option<Uuid>,
    pub upload_id: Option<String>,
    pub asset_id: Option<String>,
    pub status: VideoStatus,
    pub playback_id: Option<String>,
    pub track_id: Option<String>,
    pub track_status: Option<String>,
    pub duration_ms: i64,
    pub thumbnail: Option<StoredObject>,
    pub preview: Option<StoredObject>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    /// A fresh record for an upload the provider has just accepted.
    pub fn new_upload(owner_id: Uuid, upload_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: DEFAULT_TITLE.to_string(),
            description: None,
            visibility: Visibility::Private,
            category_id: None,
            upload_id: Some(upload_id.into()),
            asset_id: None,
            status: VideoStatus::Waiting,
            playback_id: None,
            track_id: None,
            track_status: None,
            duration_ms: 0,
            thumbnail: None,
            preview: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Storage keys of the media objects this record owns.
    pub fn owned_keys(&self) -> Vec<String> {
        [&self.thumbnail, &self.preview]
            .into_iter()
            .flatten()
            .map(|object| object.key.clone())
            .collect()
    }
}

/// Position in an owner's listing. Listings run newest update first, with the
/// id breaking ties, and resume strictly after the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCursor {
    pub id: Uuid,
    pub updated_at: DateTime<Utc>,
}

impl VideoCursor {
    pub fn of(record: &VideoRecord) -> Self {
        Self {
            id: record.id,
            updated_at: record.updated_at,
        }
    }

    /// Whether `record` comes after this cursor in listing order.
    pub fn precedes(&self, record: &VideoRecord) -> bool {
        (record.updated_at, record.id) < (self.updated_at, self.id)
    }
}

/// Orders `records` for listing and keeps at most `limit` of those after
/// `after`.
pub fn page_after(
    mut records: Vec<VideoRecord>,
    after: Option<VideoCursor>,
    limit: usize,
) -> Vec<VideoRecord> {
    if let Some(cursor) = after {
        records.retain(|record| cursor.precedes(record));
    }
    records.sort_by(|a, b| (b.updated_at, b.id).cmp(&(a.updated_at, a.id)));
    records.truncate(limit);
    records
}

/// A partial update of a [`VideoRecord`].
///
/// `None` leaves a field untouched. Nullable fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub visibility: Option<Visibility>,
    pub category_id: Option<Option<Uuid>>,
    pub status: Option<VideoStatus>,
    pub upload_id: Option<Option<String>>,
    pub asset_id: Option<Option<String>>,
    pub playback_id: Option<Option<String>>,
    pub track_id: Option<Option<String>>,
    pub track_status: Option<Option<String>>,
    pub duration_ms: Option<i64>,
    pub thumbnail: Option<Option<StoredObject>>,
    pub preview: Option<Option<StoredObject>>,
}

impl VideoPatch {
    pub fn is_empty(&self) -> bool {
        self == &VideoPatch::default()
    }

    pub fn apply(&self, record: &mut VideoRecord) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut record.title, &self.title);
        set(&mut record.description, &self.description);
        set(&mut record.visibility, &self.visibility);
        set(&mut record.category_id, &self.category_id);
        set(&mut record.status, &self.status);
        set(&mut record.upload_id, &self.upload_id);
        set(&mut record.asset_id, &self.asset_id);
        set(&mut record.playback_id, &self.playback_id);
        set(&mut record.track_id, &self.track_id);
        set(&mut record.track_status, &self.track_status);
        set(&mut record.duration_ms, &self.duration_ms);
        set(&mut record.thumbnail, &self.thumbnail);
        set(&mut record.preview, &self.preview);
        record.updated_at = Utc::now();
    }
}
