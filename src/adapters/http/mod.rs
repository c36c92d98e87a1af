//! HTTP inbound adapter shared by every deployment.

pub mod auth;
pub mod error;
pub mod videos;
pub mod webhook;
pub mod workflows;

use crate::application::videos::MAX_THUMBNAIL_BYTES;
use crate::application::Services;
use crate::domain::signature::WebhookVerifier;
use auth::RunnerToken;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub verifier: WebhookVerifier,
    /// Token the workflow runner must present. Without one the job
    /// endpoints are not mounted.
    pub workflow_token: Option<RunnerToken>,
}

impl AppState {
    pub fn new(services: Services, verifier: WebhookVerifier) -> Self {
        Self {
            services,
            verifier,
            workflow_token: None,
        }
    }

    pub fn with_workflow_token(mut self, token: &str) -> Self {
        self.workflow_token = RunnerToken::new(token);
        self
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let studio = Router::new()
        .route("/", get(videos::list).post(videos::create))
        .route(
            "/:id",
            get(videos::get)
                .patch(videos::update)
                .delete(videos::remove),
        )
        .route(
            "/:id/thumbnail",
            put(videos::upload_thumbnail).layer(DefaultBodyLimit::max(MAX_THUMBNAIL_BYTES)),
        )
        .route("/:id/restore-thumbnail", post(videos::restore_thumbnail))
        .route("/:id/revalidate", post(videos::revalidate))
        .route("/:id/generate-title", post(videos::generate_title))
        .route(
            "/:id/generate-description",
            post(videos::generate_description),
        )
        .route("/:id/generate-thumbnail", post(videos::generate_thumbnail));

    let mut app = Router::new()
        .route("/api/videos/webhook", post(webhook::receive))
        .nest("/api/studio/videos", studio);
    if state.workflow_token.is_some() {
        app = app.route("/api/videos/workflows/:kind", post(workflows::run));
    } else {
        tracing::warn!("no workflow token configured, job endpoints disabled");
    }

    app
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemoryQueue, MemoryRepository, MemoryStorage};
    use crate::application::Ports;
    use crate::domain::video::{VideoRecord, VideoStatus};
    use crate::ports::fetch::MockFetchPort;
    use crate::ports::generation::{MockImageGenerationPort, MockTextGenerationPort};
    use crate::ports::media::MockMediaProviderPort;
    use crate::ports::repository::VideoRepository;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "whsec_test";

    struct TestApp {
        router: Router,
        repo: MemoryRepository,
        storage: MemoryStorage,
        queue: MemoryQueue,
    }

    fn test_app(workflow_token: Option<&str>) -> TestApp {
        let repo = MemoryRepository::new();
        let storage = MemoryStorage::new("https://cdn.test");
        let queue = MemoryQueue::new();
        let mut fetcher = MockFetchPort::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(Bytes::from_static(b"image")));
        let mut text = MockTextGenerationPort::new();
        text.expect_generate_text()
            .returning(|_| Ok("Generated Title".to_string()));

        let services = Services::new(Ports {
            repo: Arc::new(repo.clone()),
            storage: Arc::new(storage.clone()),
            queue: Arc::new(queue.clone()),
            fetcher: Arc::new(fetcher),
            media: Arc::new(MockMediaProviderPort::new()),
            text: Arc::new(text),
            image: Arc::new(MockImageGenerationPort::new()),
        });
        let mut state = AppState::new(services, WebhookVerifier::new(SECRET));
        if let Some(token) = workflow_token {
            state = state.with_workflow_token(token);
        }

        TestApp {
            router: router(state),
            repo,
            storage,
            queue,
        }
    }

    fn signed_webhook(body: &Value) -> Request<Body> {
        let body = serde_json::to_vec(body).unwrap();
        let signature = WebhookVerifier::new(SECRET)
            .sign(&body, chrono::Utc::now().timestamp())
            .unwrap();
        Request::builder()
            .method("POST")
            .uri("/api/videos/webhook")
            .header("mux-signature", signature)
            .body(Body::from(body))
            .unwrap()
    }

    async fn text_body(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_webhook_without_signature_is_unauthorized() {
        let app = test_app(None);
        let request = Request::builder()
            .method("POST")
            .uri("/api/videos/webhook")
            .body(Body::from("not even json"))
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(text_body(response).await, "No signature found");
    }

    #[tokio::test]
    async fn test_webhook_with_wrong_signature_touches_nothing() {
        let app = test_app(None);
        let record = VideoRecord::new_upload(Uuid::new_v4(), "up_1");
        app.repo.insert(&record).await.unwrap();
        let body = json!({"type": "video.asset.errored", "data": {"upload_id": "up_1", "status": "errored"}});
        let bytes = serde_json::to_vec(&body).unwrap();
        let signature = WebhookVerifier::new("someone-else")
            .sign(&bytes, chrono::Utc::now().timestamp())
            .unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/api/videos/webhook")
            .header("mux-signature", signature)
            .body(Body::from(bytes))
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(text_body(response).await, "Invalid signature");
        assert_eq!(
            app.repo.get(record.id).await.unwrap().status,
            VideoStatus::Waiting
        );
    }

    #[tokio::test]
    async fn test_webhook_with_malformed_body_is_bad_request() {
        let app = test_app(None);
        let body = json!({"data": {}});

        let response = app.router.oneshot(signed_webhook(&body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(text_body(response).await, "Invalid payload");
    }

    #[tokio::test]
    async fn test_errored_event_sets_status() {
        let app = test_app(None);
        let record = VideoRecord::new_upload(Uuid::new_v4(), "up_1");
        app.repo.insert(&record).await.unwrap();
        let body = json!({
            "type": "video.asset.errored",
            "data": {"id": "as_1", "upload_id": "up_1", "status": "errored"}
        });

        let response = app.router.oneshot(signed_webhook(&body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text_body(response).await, "Webhook received");
        assert_eq!(
            app.repo.get(record.id).await.unwrap().status,
            VideoStatus::Errored
        );
    }

    #[tokio::test]
    async fn test_unknown_provider_status_is_acknowledged() {
        let app = test_app(None);
        let record = VideoRecord::new_upload(Uuid::new_v4(), "up_1");
        app.repo.insert(&record).await.unwrap();
        let body = json!({
            "type": "video.asset.errored",
            "data": {"upload_id": "up_1", "status": "cancelled"}
        });

        let response = app.router.oneshot(signed_webhook(&body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            app.repo.get(record.id).await.unwrap().status,
            VideoStatus::Waiting
        );
    }

    #[tokio::test]
    async fn test_ready_event_for_unknown_upload_is_not_found() {
        let app = test_app(None);
        let body = json!({
            "type": "video.asset.ready",
            "data": {
                "id": "as_1",
                "upload_id": "up_unknown",
                "status": "ready",
                "playback_ids": [{"id": "pb_1", "policy": "public"}],
                "duration": 12.5
            }
        });

        let response = app.router.oneshot(signed_webhook(&body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text_body(response).await, "Unknown Video ID");
        assert_eq!(app.repo.len().await, 0);
        assert!(app.storage.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_ready_event_relocates_assets() {
        let app = test_app(None);
        let record = VideoRecord::new_upload(Uuid::new_v4(), "up_1");
        app.repo.insert(&record).await.unwrap();
        let body = json!({
            "type": "video.asset.ready",
            "data": {
                "id": "as_1",
                "upload_id": "up_1",
                "status": "ready",
                "playback_ids": [{"id": "pb_1", "policy": "public"}],
                "duration": 12.5
            }
        });

        let response = app.router.oneshot(signed_webhook(&body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let stored = app.repo.get(record.id).await.unwrap();
        assert_eq!(stored.status, VideoStatus::Ready);
        assert_eq!(stored.duration_ms, 12500);
        assert!(stored.thumbnail.is_some());
        assert!(stored.preview.is_some());
        assert_eq!(app.storage.keys().await.len(), 2);
    }

    #[tokio::test]
    async fn test_studio_requires_user_identity() {
        let app = test_app(None);
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/studio/videos/{}/generate-title", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_generate_thumbnail_by_non_owner_is_not_found() {
        let app = test_app(None);
        let record = VideoRecord::new_upload(Uuid::new_v4(), "up_1");
        app.repo.insert(&record).await.unwrap();
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/studio/videos/{}/generate-thumbnail", record.id))
            .header("x-user-id", Uuid::new_v4().to_string())
            .header("content-type", "application/json")
            .body(Body::from(r#"{"prompt":"a calm lake at sunrise"}"#))
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(body.get("workflowRunId").is_none());
        assert!(app.queue.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_generate_title_returns_run_id() {
        let app = test_app(None);
        let owner = Uuid::new_v4();
        let record = VideoRecord::new_upload(owner, "up_1");
        app.repo.insert(&record).await.unwrap();
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/studio/videos/{}/generate-title", record.id))
            .header("x-user-id", owner.to_string())
            .body(Body::empty())
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let pending = app.queue.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(body["workflowRunId"], pending[0].run_id.as_str());
    }

    #[tokio::test]
    async fn test_patch_updates_owned_video() {
        let app = test_app(None);
        let owner = Uuid::new_v4();
        let record = VideoRecord::new_upload(owner, "up_1");
        app.repo.insert(&record).await.unwrap();
        let request = Request::builder()
            .method("PATCH")
            .uri(format!("/api/studio/videos/{}", record.id))
            .header("x-user-id", owner.to_string())
            .header("content-type", "application/json")
            .body(Body::from(r#"{"title":"Renamed","visibility":"public"}"#))
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["title"], "Renamed");
        assert_eq!(body["visibility"], "public");
    }

    #[tokio::test]
    async fn test_workflow_endpoint_checks_token() {
        let app = test_app(Some("runner-secret"));
        let owner = Uuid::new_v4();
        let mut record = VideoRecord::new_upload(owner, "up_1");
        record.playback_id = Some("pb_1".to_string());
        record.track_id = Some("tr_1".to_string());
        app.repo.insert(&record).await.unwrap();
        let payload = json!({"ownerId": owner, "videoId": record.id}).to_string();
        let request = |token: Option<&str>| {
            let mut builder = Request::builder()
                .method("POST")
                .uri("/api/videos/workflows/title")
                .header("content-type", "application/json");
            if let Some(token) = token {
                builder = builder.header("authorization", format!("Bearer {}", token));
            }
            builder.body(Body::from(payload.clone())).unwrap()
        };

        for token in [None, Some("wrong")] {
            let response = app.router.clone().oneshot(request(token)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(app.repo.get(record.id).await.unwrap().title, record.title);

        let response = app
            .router
            .oneshot(request(Some("runner-secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["title"], "Generated Title");
    }

    #[tokio::test]
    async fn test_workflow_endpoint_is_absent_without_token() {
        let app = test_app(None);
        let owner = Uuid::new_v4();
        let record = VideoRecord::new_upload(owner, "up_1");
        app.repo.insert(&record).await.unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/api/videos/workflows/title")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"ownerId": owner, "videoId": record.id}).to_string(),
            ))
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(app.repo.get(record.id).await.unwrap().title, record.title);
    }

    #[tokio::test]
    async fn test_get_and_list_are_owner_scoped() {
        let app = test_app(None);
        let owner = Uuid::new_v4();
        let mine = VideoRecord::new_upload(owner, "up_1");
        let theirs = VideoRecord::new_upload(Uuid::new_v4(), "up_2");
        app.repo.insert(&mine).await.unwrap();
        app.repo.insert(&theirs).await.unwrap();
        let get = |uri: String| {
            Request::builder()
                .uri(uri)
                .header("x-user-id", owner.to_string())
                .body(Body::empty())
                .unwrap()
        };

        let response = app
            .router
            .clone()
            .oneshot(get(format!("/api/studio/videos/{}", mine.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], mine.id.to_string());

        let response = app
            .router
            .clone()
            .oneshot(get(format!("/api/studio/videos/{}", theirs.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .router
            .clone()
            .oneshot(get("/api/studio/videos?limit=10".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = json_body(response).await;
        assert_eq!(page["items"].as_array().unwrap().len(), 1);
        assert_eq!(page["items"][0]["id"], mine.id.to_string());
        assert!(page["nextCursor"].is_null());

        let response = app
            .router
            .oneshot(get(format!("/api/studio/videos?cursorId={}", mine.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_thumbnail_upload_stores_image() {
        let app = test_app(None);
        let owner = Uuid::new_v4();
        let record = VideoRecord::new_upload(owner, "up_1");
        app.repo.insert(&record).await.unwrap();
        let upload = |content_type: &str| {
            Request::builder()
                .method("PUT")
                .uri(format!("/api/studio/videos/{}/thumbnail", record.id))
                .header("x-user-id", owner.to_string())
                .header("content-type", content_type)
                .body(Body::from(&b"\x89PNG"[..]))
                .unwrap()
        };

        let response = app.router.clone().oneshot(upload("text/plain")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(app.storage.keys().await.is_empty());

        let response = app.router.oneshot(upload("image/png")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stored = app.repo.get(record.id).await.unwrap().thumbnail.unwrap();
        assert_eq!(app.storage.keys().await, vec![stored.key]);
    }
}
