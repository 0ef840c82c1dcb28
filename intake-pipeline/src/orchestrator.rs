use std::sync::Arc;

use common::{
    storage::types::patient_document::{PatientDocument, UploadStatus},
    utils::config::BatchPolicy,
};
use futures::future::{join_all, try_join_all};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    error::{IntakeError, UploadErrorKind},
    sections::Section,
    services::{DocumentStorage, IntakeRecords},
    session::{UploadSession, UploadedFile},
};

const STORAGE_FAILURE_REASON: &str = "Upload failed: the file could not be stored";
const METADATA_FAILURE_REASON: &str = "Upload failed: the document record could not be saved";

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub file_id: String,
    pub file_name: String,
    pub section: Section,
    pub subtype: String,
    pub status: UploadStatus,
    pub storage_path: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<UploadErrorKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub uploaded: usize,
    pub failed: usize,
    pub files: Vec<FileOutcome>,
}

/// Uploads every queued file of a session: blob first, then its metadata row.
pub struct UploadOrchestrator {
    storage: Arc<dyn DocumentStorage>,
    records: Arc<dyn IntakeRecords>,
    batch_policy: BatchPolicy,
}

impl UploadOrchestrator {
    pub fn new(
        storage: Arc<dyn DocumentStorage>,
        records: Arc<dyn IntakeRecords>,
        batch_policy: BatchPolicy,
    ) -> Self {
        Self {
            storage,
            records,
            batch_policy,
        }
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        self.batch_policy
    }

    /// Runs all uploads concurrently and settles each file's status by id.
    ///
    /// Under [`BatchPolicy::Independent`] the call returns once every file has settled.
    /// Under [`BatchPolicy::AllOrNothing`] the first failure ends the batch with
    /// [`IntakeError::BatchAborted`]; files still in flight are dropped and stay pending.
    pub async fn upload_all(
        &self,
        submission_id: &str,
        session: &Mutex<UploadSession>,
    ) -> Result<BatchReport, IntakeError> {
        let files = session.lock().await.begin_batch();
        info!(
            %submission_id,
            files = files.len(),
            policy = ?self.batch_policy,
            "Uploading submission documents"
        );

        let outcomes = match self.batch_policy {
            BatchPolicy::Independent => {
                join_all(
                    files
                        .into_iter()
                        .map(|file| self.upload_one(submission_id, file, session)),
                )
                .await
            }
            BatchPolicy::AllOrNothing => {
                try_join_all(files.into_iter().map(|file| async move {
                    let outcome = self.upload_one(submission_id, file, session).await;
                    match outcome.error_kind {
                        Some(kind) => Err(IntakeError::BatchAborted {
                            file_name: outcome.file_name,
                            kind,
                        }),
                        None => Ok(outcome),
                    }
                }))
                .await?
            }
        };

        let uploaded = outcomes
            .iter()
            .filter(|outcome| outcome.status == UploadStatus::Uploaded)
            .count();
        let failed = outcomes.len().saturating_sub(uploaded);
        info!(%submission_id, uploaded, failed, "Upload batch settled");

        Ok(BatchReport {
            uploaded,
            failed,
            files: outcomes,
        })
    }

    async fn upload_one(
        &self,
        submission_id: &str,
        file: UploadedFile,
        session: &Mutex<UploadSession>,
    ) -> FileOutcome {
        let storage_path =
            PatientDocument::storage_path_for(submission_id, file.section.key(), &file.file_name);

        let result = match self
            .storage
            .put_document(&storage_path, file.payload.clone())
            .await
        {
            Err(err) => {
                warn!(file_id = %file.id, path = %storage_path, error = %err, "Document upload failed");
                Err((UploadErrorKind::StorageUploadFailure, STORAGE_FAILURE_REASON))
            }
            Ok(()) => {
                let document = PatientDocument::new(
                    submission_id.to_string(),
                    file.section.key().to_string(),
                    file.subtype.clone(),
                    file.file_name.clone(),
                    storage_path.clone(),
                    &file.payload,
                    file.mime_type.clone(),
                );
                self.records.insert_document(document).await.map_err(|err| {
                    warn!(file_id = %file.id, error = %err, "Document record insert failed");
                    (UploadErrorKind::MetadataInsertFailure, METADATA_FAILURE_REASON)
                })
            }
        };

        let mut guard = session.lock().await;
        match result {
            Ok(()) => {
                guard.mark_uploaded(&file.id);
                FileOutcome {
                    file_id: file.id,
                    file_name: file.file_name,
                    section: file.section,
                    subtype: file.subtype,
                    status: UploadStatus::Uploaded,
                    storage_path: Some(storage_path),
                    error: None,
                    error_kind: None,
                }
            }
            Err((kind, reason)) => {
                guard.mark_failed(&file.id, kind, reason.to_string());
                FileOutcome {
                    file_id: file.id,
                    file_name: file.file_name,
                    section: file.section,
                    subtype: file.subtype,
                    status: UploadStatus::Error,
                    storage_path: None,
                    error: Some(reason.to_string()),
                    error_kind: Some(kind),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use common::{
        error::AppError,
        storage::types::patient_submission::PatientSubmission,
        utils::{config::SubtypeSelection, upload_limits::UploadPolicy},
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::session::IncomingFile;

    /// Storage double failing every location whose file name contains `fail`.
    #[derive(Default)]
    struct FlakyStorage {
        stored: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentStorage for FlakyStorage {
        async fn put_document(&self, location: &str, _payload: Bytes) -> Result<(), AppError> {
            if location.contains("fail") {
                return Err(AppError::Processing("storage unavailable".into()));
            }
            self.stored.lock().await.push(location.to_string());
            Ok(())
        }
    }

    /// Records double rejecting documents whose file name contains `reject`.
    #[derive(Default)]
    struct RecordingRecords {
        documents: Mutex<Vec<PatientDocument>>,
        submissions: AtomicUsize,
    }

    #[async_trait]
    impl IntakeRecords for RecordingRecords {
        async fn create_submission(
            &self,
            submission: PatientSubmission,
        ) -> Result<PatientSubmission, AppError> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            Ok(submission)
        }

        async fn insert_document(&self, document: PatientDocument) -> Result<(), AppError> {
            if document.file_name.contains("reject") {
                return Err(AppError::Validation("insert refused".into()));
            }
            self.documents.lock().await.push(document);
            Ok(())
        }
    }

    fn session_with(names: &[&str]) -> Mutex<UploadSession> {
        let mut session = UploadSession::new(UploadPolicy::default(), SubtypeSelection::Persist);
        session
            .select_subtype(Section::LabResults, "CBC")
            .expect("select");
        let files = names
            .iter()
            .map(|name| {
                IncomingFile::new(*name, Some("application/pdf"), Bytes::from_static(b"%PDF"))
            })
            .collect();
        session
            .add_files(Section::LabResults, files)
            .expect("add files");
        Mutex::new(session)
    }

    #[tokio::test]
    async fn independent_batch_accounts_every_file() {
        let storage = Arc::new(FlakyStorage::default());
        let records = Arc::new(RecordingRecords::default());
        let orchestrator =
            UploadOrchestrator::new(storage.clone(), records.clone(), BatchPolicy::Independent);
        let session = session_with(&["a.pdf", "fail-b.pdf", "c.pdf", "reject-d.pdf", "e.pdf"]);

        let report = orchestrator
            .upload_all("sub-1", &session)
            .await
            .expect("batch");

        assert_eq!(report.uploaded, 3);
        assert_eq!(report.failed, 2);
        let guard = session.lock().await;
        assert_eq!(guard.count_with_status(UploadStatus::Uploaded), 3);
        assert_eq!(guard.count_with_status(UploadStatus::Error), 2);
        assert_eq!(guard.count_with_status(UploadStatus::Pending), 0);

        let failed_b = guard
            .files()
            .iter()
            .find(|f| f.file_name == "fail-b.pdf")
            .expect("file b");
        assert_eq!(
            failed_b.error_kind,
            Some(UploadErrorKind::StorageUploadFailure)
        );
        let failed_d = guard
            .files()
            .iter()
            .find(|f| f.file_name == "reject-d.pdf")
            .expect("file d");
        assert_eq!(
            failed_d.error_kind,
            Some(UploadErrorKind::MetadataInsertFailure)
        );

        assert_eq!(records.documents.lock().await.len(), 3);
        assert_eq!(storage.stored.lock().await.len(), 4);
    }

    #[tokio::test]
    async fn storage_paths_are_unique_per_file() {
        let storage = Arc::new(FlakyStorage::default());
        let records = Arc::new(RecordingRecords::default());
        let orchestrator =
            UploadOrchestrator::new(storage.clone(), records, BatchPolicy::Independent);
        let session = session_with(&["same.pdf", "same.pdf", "same.pdf"]);

        orchestrator
            .upload_all("sub-2", &session)
            .await
            .expect("batch");

        let mut stored = storage.stored.lock().await.clone();
        stored.sort();
        stored.dedup();
        assert_eq!(stored.len(), 3);
        assert!(stored
            .iter()
            .all(|path| path.starts_with("sub-2/lab_results/")));
    }

    #[tokio::test]
    async fn all_or_nothing_aborts_on_first_failure() {
        let storage = Arc::new(FlakyStorage::default());
        let records = Arc::new(RecordingRecords::default());
        let orchestrator =
            UploadOrchestrator::new(storage, records, BatchPolicy::AllOrNothing);
        let session = session_with(&["fail-only.pdf"]);

        let result = orchestrator.upload_all("sub-3", &session).await;

        assert!(matches!(
            result,
            Err(IntakeError::BatchAborted {
                kind: UploadErrorKind::StorageUploadFailure,
                ..
            })
        ));
        assert_eq!(
            session.lock().await.count_with_status(UploadStatus::Error),
            1
        );
    }

    #[tokio::test]
    async fn all_or_nothing_succeeds_when_every_file_does() {
        let orchestrator = UploadOrchestrator::new(
            Arc::new(FlakyStorage::default()),
            Arc::new(RecordingRecords::default()),
            BatchPolicy::AllOrNothing,
        );
        let session = session_with(&["a.pdf", "b.pdf"]);

        let report = orchestrator
            .upload_all("sub-4", &session)
            .await
            .expect("batch");

        assert_eq!((report.uploaded, report.failed), (2, 0));
    }
}
