use axum::{extract::State, response::IntoResponse, Json};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use bytes::Bytes;
use common::utils::{
    pdf_text::{extract_pdf_text, PdfLimits},
    upload_limits::resolve_mime_type,
};
use serde::Serialize;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, TryFromMultipart)]
pub struct AttachmentParams {
    #[form_data(limit = "unlimited")]
    pub file: FieldData<Bytes>,
}

#[derive(Debug, Serialize)]
pub struct AttachmentText {
    pub file_name: String,
    pub page_count: usize,
    pub text: String,
}

/// Extracts the text of an uploaded PDF so a client can append it to its next message.
pub async fn extract_attachment(
    State(state): State<ApiState>,
    TypedMultipart(input): TypedMultipart<AttachmentParams>,
) -> Result<impl IntoResponse, ApiError> {
    let file_name = input
        .file
        .metadata
        .file_name
        .clone()
        .unwrap_or_else(|| "attachment.pdf".to_string());
    let mime_type = resolve_mime_type(input.file.metadata.content_type.as_deref(), &file_name);

    info!(%file_name, %mime_type, bytes = input.file.contents.len(), "Received chat attachment");

    let extracted = extract_pdf_text(
        input.file.contents.to_vec(),
        &mime_type,
        PdfLimits::from_config(&state.config),
    )
    .await?;

    Ok(Json(AttachmentText {
        file_name,
        page_count: extracted.page_count,
        text: extracted.text,
    }))
}
