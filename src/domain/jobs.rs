use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of times the workflow runner retries a failed run.
pub const DEFAULT_RETRIES: u32 = 1;

/// Shortest prompt accepted for thumbnail generation.
pub const MIN_PROMPT_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    Title,
    Description,
    Thumbnail,
}

impl GenerationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationKind::Title => "title",
            GenerationKind::Description => "description",
            GenerationKind::Thumbnail => "thumbnail",
        }
    }
}

/// Body a generation job is invoked with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    #[serde(alias = "userId")]
    pub owner_id: Uuid,
    pub video_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// What a trigger hands to the workflow runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub kind: GenerationKind,
    pub payload: JobPayload,
    pub retries: u32,
}

/// A run as it sits on the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub run_id: String,
    pub request: WorkflowRequest,
    #[serde(default)]
    pub attempt: u32,
}

impl Job {
    pub fn new(run_id: impl Into<String>, request: WorkflowRequest) -> Self {
        Self {
            run_id: run_id.into(),
            request,
            attempt: 0,
        }
    }

    pub fn has_retries_left(&self) -> bool {
        self.attempt < self.request.retries
    }

    pub fn next_attempt(mut self) -> Self {
        self.attempt += 1;
        self
    }
}

pub fn new_run_id() -> String {
    format!("wfr_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_wire_format() {
        let payload = JobPayload {
            owner_id: Uuid::nil(),
            video_id: Uuid::nil(),
            prompt: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ownerId": "00000000-0000-0000-0000-000000000000",
                "videoId": "00000000-0000-0000-0000-000000000000"
            })
        );
    }

    #[test]
    fn test_retry_budget() {
        let job = Job::new(
            "wfr_1",
            WorkflowRequest {
                kind: GenerationKind::Title,
                payload: JobPayload {
                    owner_id: Uuid::new_v4(),
                    video_id: Uuid::new_v4(),
                    prompt: None,
                },
                retries: DEFAULT_RETRIES,
            },
        );

        assert!(job.has_retries_left());
        let job = job.next_attempt();
        assert_eq!(job.attempt, 1);
        assert!(!job.has_retries_left());
    }
}
