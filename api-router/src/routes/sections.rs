use axum::{response::IntoResponse, Json};
use intake_pipeline::sections::catalogue;

pub async fn list_sections() -> impl IntoResponse {
    Json(catalogue())
}
