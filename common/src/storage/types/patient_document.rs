use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    error::AppError,
    storage::{db::SurrealDbClient, types::StoredObject},
    stored_object,
};

/// Lifecycle of one uploaded file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploaded,
    Error,
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadStatus::Pending => write!(f, "pending"),
            UploadStatus::Uploaded => write!(f, "uploaded"),
            UploadStatus::Error => write!(f, "error"),
        }
    }
}

stored_object!(PatientDocument, "patient_document", {
    submission_id: String,
    section: String,
    subtype: String,
    file_name: String,
    storage_path: String,
    file_size: u64,
    mime_type: String,
    upload_status: UploadStatus,
    sha256: String
});

impl PatientDocument {
    /// Metadata row for a payload that already reached object storage.
    pub fn new(
        submission_id: String,
        section: String,
        subtype: String,
        file_name: String,
        storage_path: String,
        payload: &[u8],
        mime_type: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            submission_id,
            section,
            subtype,
            file_name,
            storage_path,
            file_size: payload.len() as u64,
            mime_type,
            upload_status: UploadStatus::Uploaded,
            sha256: sha256_hex(payload),
        }
    }

    /// Object storage location: `{submission}/{section}/{unique}-{sanitized name}`.
    pub fn storage_path_for(submission_id: &str, section_key: &str, file_name: &str) -> String {
        format!(
            "{}/{}/{}-{}",
            submission_id,
            section_key,
            Uuid::new_v4().simple(),
            sanitize_file_name(file_name)
        )
    }

    pub async fn for_submission(
        submission_id: &str,
        db: &SurrealDbClient,
    ) -> Result<Vec<Self>, AppError> {
        let documents: Vec<Self> = db
            .client
            .query("SELECT * FROM type::table($table) WHERE submission_id = $submission_id ORDER BY created_at ASC")
            .bind(("table", Self::table_name()))
            .bind(("submission_id", submission_id.to_owned()))
            .await?
            .take(0)?;

        Ok(documents)
    }
}

/// Replaces every character of the stem that is not alphanumeric or `_` with `_`,
/// keeping the extension.
pub fn sanitize_file_name(file_name: &str) -> String {
    let replace = |c: char| {
        if c.is_ascii_alphanumeric() || c == '_' {
            c
        } else {
            '_'
        }
    };

    match file_name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!("{}.{}", stem.chars().map(replace).collect::<String>(), ext)
        }
        _ => file_name.chars().map(replace).collect(),
    }
}

pub fn sha256_hex(payload: &[u8]) -> String {
    format!("{:x}", Sha256::digest(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_stem_and_keeps_extension() {
        assert_eq!(sanitize_file_name("MRI scan (1).pdf"), "MRI_scan__1_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize_file_name("report"), "report");
        assert_eq!(sanitize_file_name(".hidden"), "_hidden");
    }

    #[test]
    fn storage_paths_are_unique_and_structured() {
        let first = PatientDocument::storage_path_for("sub-1", "lab_results", "cbc.pdf");
        let second = PatientDocument::storage_path_for("sub-1", "lab_results", "cbc.pdf");

        assert_ne!(first, second);
        let parts: Vec<&str> = first.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "sub-1");
        assert_eq!(parts[1], "lab_results");
        assert!(parts[2].ends_with("-cbc.pdf"));
        assert_eq!(parts[2].len(), 32 + 1 + "cbc.pdf".len());
    }

    #[test]
    fn new_document_records_size_and_digest() {
        let doc = PatientDocument::new(
            "sub-1".into(),
            "imaging_notes".into(),
            "MRI".into(),
            "brain.pdf".into(),
            "sub-1/imaging_notes/x-brain.pdf".into(),
            b"abc",
            "application/pdf".into(),
        );

        assert_eq!(doc.file_size, 3);
        assert_eq!(doc.upload_status, UploadStatus::Uploaded);
        assert_eq!(
            doc.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn lists_documents_of_one_submission() {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");
        db.ensure_initialized()
            .await
            .expect("Failed to initialize schema");

        for (submission, name) in [("a", "one.pdf"), ("a", "two.pdf"), ("b", "three.pdf")] {
            let doc = PatientDocument::new(
                submission.into(),
                "clinical_notes".into(),
                "Progress Note".into(),
                name.into(),
                PatientDocument::storage_path_for(submission, "clinical_notes", name),
                b"%PDF",
                "application/pdf".into(),
            );
            db.store_item(doc).await.expect("Failed to store document");
        }

        let documents = PatientDocument::for_submission("a", &db)
            .await
            .expect("Failed to list documents");

        assert_eq!(documents.len(), 2);
        assert!(documents.iter().all(|doc| doc.submission_id == "a"));
    }
}
