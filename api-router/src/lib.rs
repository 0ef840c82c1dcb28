use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use routes::{
    attachments::extract_attachment,
    chat::ai_chat,
    liveness::live,
    readiness::ready,
    sections::list_sections,
    submissions::{create_submission, get_submission},
};

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Public endpoints for k8s/systemd probes
    let probes = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let chat = Router::new()
        .route("/ai-chat", post(ai_chat))
        .route(
            "/chat/attachments",
            post(extract_attachment).layer(DefaultBodyLimit::max(
                app_state.config.attachment_max_bytes.saturating_mul(2),
            )),
        );

    let intake = Router::new()
        .route(
            "/submissions",
            post(create_submission).layer(DefaultBodyLimit::max(
                app_state.config.upload_max_body_bytes,
            )),
        )
        .route("/submissions/{id}", get(get_submission))
        .route("/sections", get(list_sections));

    probes.merge(chat).merge(intake)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use api_state::openai_client_for;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use common::{
        storage::{db::SurrealDbClient, store::testing::memory_storage},
        utils::config::AppConfig,
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    const BOUNDARY: &str = "intake-test-boundary";

    async fn test_router() -> Router {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");
        db.ensure_initialized()
            .await
            .expect("Failed to initialize schema");
        let config = AppConfig::default();
        let state = ApiState::with_resources(
            Arc::new(db),
            config.clone(),
            memory_storage(),
            openai_client_for(&config),
        );

        Router::new()
            .nest("/api/v1", api_routes_v1(&state))
            .with_state(state)
    }

    fn text_part(name: &str, value: &str) -> String {
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
    }

    fn file_part(name: &str, file_name: &str, content_type: &str, body: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n{body}\r\n"
        )
    }

    fn multipart_request(uri: &str, parts: &[String]) -> Request<Body> {
        let mut body = parts.concat();
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn identity_parts(full_name: &str) -> Vec<String> {
        vec![
            text_part("full_name", full_name),
            text_part("age", "45"),
            text_part("date_of_birth", "1980-01-01"),
            text_part("address", "123 Main St"),
            text_part("phone_number", "5551234567"),
        ]
    }

    #[tokio::test]
    async fn probes_answer() {
        let router = test_router().await;

        let live = router
            .clone()
            .oneshot(Request::get("/api/v1/live").body(Body::empty()).expect("request"))
            .await
            .expect("live");
        assert_eq!(live.status(), StatusCode::OK);

        let ready = router
            .oneshot(Request::get("/api/v1/ready").body(Body::empty()).expect("request"))
            .await
            .expect("ready");
        assert_eq!(ready.status(), StatusCode::OK);
        assert_eq!(json_body(ready).await["checks"]["db"], "ok");
    }

    #[tokio::test]
    async fn sections_catalogue_lists_five_sections() {
        let response = test_router()
            .await
            .oneshot(Request::get("/api/v1/sections").body(Body::empty()).expect("request"))
            .await
            .expect("sections");

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let sections = body.as_array().expect("array");
        assert_eq!(sections.len(), 5);
        assert_eq!(sections[0]["key"], "referral_note");
    }

    #[tokio::test]
    async fn submission_round_trip() {
        let router = test_router().await;
        let mut parts = identity_parts("John Doe");
        parts.push(text_part(
            "manifest",
            r#"[{"section":"referral_note","subtype":"General"},{"section":"imaging_notes","subtype":"mri"}]"#,
        ));
        parts.push(file_part("files", "referral.pdf", "application/pdf", "%PDF-1.5"));
        parts.push(file_part("files", "brain.png", "image/png", "PNG"));

        let response = router
            .clone()
            .oneshot(multipart_request("/api/v1/submissions", &parts))
            .await
            .expect("submit");

        assert_eq!(response.status(), StatusCode::CREATED);
        let receipt = json_body(response).await;
        assert_eq!(receipt["uploaded"], 2);
        assert_eq!(receipt["failed"], 0);
        let id = receipt["submission_id"].as_str().expect("id").to_string();

        let details = router
            .oneshot(
                Request::get(format!("/api/v1/submissions/{id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("details");
        assert_eq!(details.status(), StatusCode::OK);
        let details = json_body(details).await;
        assert_eq!(details["submission"]["full_name"], "John Doe");
        assert_eq!(details["submission"]["phone_number"], "555-123-4567");
        assert_eq!(details["documents"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn invalid_identity_is_a_bad_request() {
        let mut parts = identity_parts("");
        parts.push(text_part(
            "manifest",
            r#"[{"section":"lab_results","subtype":"CBC"}]"#,
        ));
        parts.push(file_part("files", "cbc.pdf", "application/pdf", "%PDF"));

        let response = test_router()
            .await
            .oneshot(multipart_request("/api/v1/submissions", &parts))
            .await
            .expect("submit");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "Please enter patient full name"
        );
    }

    #[tokio::test]
    async fn manifest_must_match_files() {
        let mut parts = identity_parts("John Doe");
        parts.push(text_part("manifest", "[]"));
        parts.push(file_part("files", "cbc.pdf", "application/pdf", "%PDF"));

        let response = test_router()
            .await
            .oneshot(multipart_request("/api/v1/submissions", &parts))
            .await
            .expect("submit");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_submission_is_not_found() {
        let response = test_router()
            .await
            .oneshot(
                Request::get("/api/v1/submissions/missing")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("details");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn attachment_rejects_non_pdf() {
        let parts = vec![file_part("file", "photo.png", "image/png", "PNG")];

        let response = test_router()
            .await
            .oneshot(multipart_request("/api/v1/chat/attachments", &parts))
            .await
            .expect("attach");

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn chat_requires_messages() {
        let response = test_router()
            .await
            .oneshot(
                Request::post("/api/v1/ai-chat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"messages":[]}"#))
                    .expect("request"),
            )
            .await
            .expect("chat");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
