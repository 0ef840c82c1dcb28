use api_router::{api_routes_v1, api_state::ApiState};
use axum::Router;
use common::{
    storage::{store::StorageManager, types::triage_settings::TriageSettings},
    utils::config::get_config,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;

    let storage = StorageManager::new(&config).await?;
    info!(backend = ?storage.backend_kind(), "Object storage ready");

    // Connects, defines the schema and builds indexes
    let api_state = ApiState::new(&config, storage).await?;

    let seed = TriageSettings::from_config(&config).await?;
    let settings = TriageSettings::sync(&api_state.db, seed).await?;
    info!(
        prompt_version = %settings.prompt_version,
        model = %settings.model,
        "Triage settings ready"
    );

    let app = app_router(api_state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn app_router(api_state: ApiState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes_v1(&api_state))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(api_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use api_router::api_state::openai_client_for;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use common::{
        storage::{db::SurrealDbClient, store::testing::memory_storage},
        utils::config::AppConfig,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn smoke_live_probe_with_cors() {
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

        let response = app_router(state)
            .oneshot(
                Request::get("/api/v1/live")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("*")
        );
    }
}
