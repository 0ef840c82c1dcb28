use std::{convert::Infallible, sync::Arc};

use api_router::{api_routes_v1, api_state::ApiState, api_state::openai_client_for};
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use common::{
    storage::{
        db::SurrealDbClient,
        store::{testing::memory_storage, StorageManager},
        types::triage_settings::TriageSettings,
    },
    utils::config::{AppConfig, StorageKind},
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};
use uuid::Uuid;

/// Sets up an in-memory test database with schema and triage settings in place
pub async fn setup_test_database(config: &AppConfig) -> Arc<SurrealDbClient> {
    let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
        .await
        .expect("Failed to start in-memory surrealdb");

    db.ensure_initialized()
        .await
        .expect("Failed to initialize schema");

    let seed = TriageSettings::from_config(config)
        .await
        .expect("Failed to build triage settings");
    TriageSettings::sync(&db, seed)
        .await
        .expect("Failed to seed triage settings");

    Arc::new(db)
}

/// Creates mock configuration for testing, pointing the chat proxy at `upstream_base`
pub fn create_mock_config(upstream_base: &str) -> AppConfig {
    AppConfig {
        surrealdb_address: "mem://".to_string(),
        openai_api_key: "test-key".to_string(),
        openai_base_url: format!("{upstream_base}/v1"),
        http_port: 0,
        storage: StorageKind::Memory,
        ..AppConfig::default()
    }
}

pub struct TestServer {
    pub base_url: String,
    pub db: Arc<SurrealDbClient>,
    pub storage: StorageManager,
}

/// Serves the v1 API on an ephemeral port
pub async fn spawn_api(config: AppConfig) -> TestServer {
    let db = setup_test_database(&config).await;
    let storage = memory_storage();
    let state = ApiState::with_resources(
        Arc::clone(&db),
        config.clone(),
        storage.clone(),
        openai_client_for(&config),
    );
    let app = Router::new()
        .nest("/api/v1", api_routes_v1(&state))
        .with_state(state);

    TestServer {
        base_url: serve(app).await,
        db,
        storage,
    }
}

pub async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{addr}")
}

/// Stand-in for an OpenAI-compatible provider that streams a fixed answer and
/// remembers every request body it received.
#[derive(Clone)]
pub struct StubUpstream {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<Value>>>,
}

impl StubUpstream {
    pub async fn streaming(reply_chunks: Vec<&'static str>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(body): Json<Value>| {
                let recorded = Arc::clone(&recorded);
                let reply_chunks = reply_chunks.clone();
                async move {
                    recorded.lock().await.push(body);
                    completion_stream(&reply_chunks)
                }
            }),
        );

        Self {
            base_url: serve(app).await,
            requests,
        }
    }

    pub async fn failing() -> Self {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({"error": {"message": "overloaded", "type": "server_error"}})),
                )
            }),
        );

        Self {
            base_url: serve(app).await,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

fn completion_stream(chunks: &[&str]) -> Response {
    let mut events: Vec<Result<String, Infallible>> = chunks
        .iter()
        .map(|content| {
            let chunk = json!({
                "id": "chatcmpl-test",
                "object": "chat.completion.chunk",
                "created": 1_700_000_000,
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "delta": { "content": content },
                    "finish_reason": null
                }]
            });
            Ok(format!("data: {chunk}\n\n"))
        })
        .collect();
    events.push(Ok("data: [DONE]\n\n".to_string()));

    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(futures::stream::iter(events)),
    )
        .into_response()
}
