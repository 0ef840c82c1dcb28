use async_trait::async_trait;
use bytes::Bytes;
use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        store::StorageManager,
        types::{patient_document::PatientDocument, patient_submission::PatientSubmission},
    },
};

/// Blob side of a document upload.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    async fn put_document(&self, location: &str, payload: Bytes) -> Result<(), AppError>;
}

/// Record side of an intake: submissions and document metadata rows.
#[async_trait]
pub trait IntakeRecords: Send + Sync {
    async fn create_submission(
        &self,
        submission: PatientSubmission,
    ) -> Result<PatientSubmission, AppError>;

    async fn insert_document(&self, document: PatientDocument) -> Result<(), AppError>;
}

#[async_trait]
impl DocumentStorage for StorageManager {
    async fn put_document(&self, location: &str, payload: Bytes) -> Result<(), AppError> {
        self.put(location, payload).await?;
        Ok(())
    }
}

#[async_trait]
impl IntakeRecords for SurrealDbClient {
    async fn create_submission(
        &self,
        submission: PatientSubmission,
    ) -> Result<PatientSubmission, AppError> {
        self.store_item(submission)
            .await?
            .ok_or_else(|| AppError::InternalError("Submission insert returned no row".into()))
    }

    async fn insert_document(&self, document: PatientDocument) -> Result<(), AppError> {
        self.store_item(document)
            .await?
            .ok_or_else(|| AppError::InternalError("Document insert returned no row".into()))?;
        Ok(())
    }
}
