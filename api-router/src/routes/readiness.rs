use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::api_state::ApiState;

const STORAGE_PROBE_PATH: &str = "readiness/probe";

/// Readiness probe: 200 when both the record store and the object store answer,
/// 503 with the failing checks otherwise.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    let db = state.db.health_check().await.map_err(|e| e.to_string());
    let storage = state
        .storage
        .exists(STORAGE_PROBE_PATH)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string());

    let status = if db.is_ok() && storage.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let mut failures = Vec::new();
    for (name, check) in [("db", &db), ("storage", &storage)] {
        if let Err(reason) = check {
            failures.push(json!({ "check": name, "reason": reason }));
        }
    }

    let body: Value = json!({
        "status": if status == StatusCode::OK { "ok" } else { "error" },
        "checks": {
            "db": check_label(&db),
            "storage": check_label(&storage),
        },
        "failures": failures,
    });

    (status, Json(body))
}

fn check_label(check: &Result<(), String>) -> &'static str {
    if check.is_ok() {
        "ok"
    } else {
        "fail"
    }
}
