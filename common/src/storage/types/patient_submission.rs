use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    storage::{db::SurrealDbClient, types::patient_document::PatientDocument},
    stored_object,
};

stored_object!(PatientSubmission, "patient_submission", {
    full_name: String,
    age: u8,
    date_of_birth: NaiveDate,
    address: String,
    phone_number: String
});

impl PatientSubmission {
    pub fn new(
        full_name: String,
        age: u8,
        date_of_birth: NaiveDate,
        address: String,
        phone_number: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            full_name,
            age,
            date_of_birth,
            address,
            phone_number,
        }
    }

    /// Loads a submission together with its document rows.
    pub async fn get_with_documents(
        id: &str,
        db: &SurrealDbClient,
    ) -> Result<(Self, Vec<PatientDocument>), AppError> {
        let submission: Self = db
            .get_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;
        let documents = PatientDocument::for_submission(id, db).await?;

        Ok((submission, documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db() -> SurrealDbClient {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");
        db.ensure_initialized()
            .await
            .expect("Failed to initialize schema");
        db
    }

    fn john_doe() -> PatientSubmission {
        PatientSubmission::new(
            "John Doe".to_string(),
            45,
            NaiveDate::from_ymd_opt(1980, 1, 1).expect("valid date"),
            "123 Main St".to_string(),
            "555-123-4567".to_string(),
        )
    }

    #[tokio::test]
    async fn stores_and_reads_back_submission() {
        let db = memory_db().await;
        let submission = john_doe();

        db.store_item(submission.clone())
            .await
            .expect("Failed to store submission");

        let (fetched, documents) = PatientSubmission::get_with_documents(&submission.id, &db)
            .await
            .expect("Failed to fetch submission");

        assert_eq!(fetched.full_name, "John Doe");
        assert_eq!(fetched.date_of_birth, submission.date_of_birth);
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn missing_submission_is_not_found() {
        let db = memory_db().await;

        let result = PatientSubmission::get_with_documents("nope", &db).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
