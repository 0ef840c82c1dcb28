use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use bytes::Bytes;
use common::storage::types::{
    patient_document::PatientDocument, patient_submission::PatientSubmission,
};
use intake_pipeline::{
    session::RejectedFile, IncomingFile, IntakeError, IntakeForm, Section, SubmissionReceipt,
    UploadSession,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, TryFromMultipart)]
pub struct SubmissionParams {
    pub full_name: String,
    pub age: String,
    pub date_of_birth: String,
    pub address: String,
    pub phone_number: String,
    /// JSON array of `{section, subtype}`, one entry per `files` part in the same order.
    pub manifest: String,
    #[form_data(limit = "unlimited")]
    #[form_data(default)]
    pub files: Vec<FieldData<Bytes>>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestEntry {
    pub section: String,
    pub subtype: String,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    #[serde(flatten)]
    pub receipt: SubmissionReceipt,
    pub rejected: Vec<RejectedFile>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionDetails {
    pub submission: PatientSubmission,
    pub documents: Vec<PatientDocument>,
}

pub async fn create_submission(
    State(state): State<ApiState>,
    TypedMultipart(input): TypedMultipart<SubmissionParams>,
) -> Result<impl IntoResponse, ApiError> {
    let manifest: Vec<ManifestEntry> = serde_json::from_str(&input.manifest)
        .map_err(|err| ApiError::ValidationError(format!("Invalid manifest: {err}")))?;
    if manifest.len() != input.files.len() {
        return Err(ApiError::ValidationError(format!(
            "Manifest lists {} files but {} were uploaded",
            manifest.len(),
            input.files.len()
        )));
    }

    info!(files = input.files.len(), "Received intake submission");

    let mut session = UploadSession::from_config(&state.config);
    let mut rejected = Vec::new();
    for (entry, file) in manifest.into_iter().zip(input.files) {
        let section = Section::from_key(&entry.section)
            .ok_or_else(|| IntakeError::UnknownSection(entry.section.clone()))?;
        session.select_subtype(section, &entry.subtype)?;

        let file_name = file
            .metadata
            .file_name
            .unwrap_or_else(|| "document".to_string());
        let incoming =
            IncomingFile::new(file_name, file.metadata.content_type.as_deref(), file.contents);
        rejected.extend(session.add_files(section, vec![incoming])?.rejected);
    }

    let form = IntakeForm {
        full_name: input.full_name,
        age: input.age,
        date_of_birth: input.date_of_birth,
        address: input.address,
        phone_number: input.phone_number,
    };
    let session = Mutex::new(session);
    let receipt = state.intake_controller().submit(&form, &session).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse { receipt, rejected }),
    ))
}

pub async fn get_submission(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (submission, documents) = PatientSubmission::get_with_documents(&id, &state.db).await?;

    Ok(Json(SubmissionDetails {
        submission,
        documents,
    }))
}
