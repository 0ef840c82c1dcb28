use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{NaiveDate, Utc};
use common::utils::config::AppConfig;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::{
    error::IntakeError,
    form::{IntakeForm, IntakeRules, IntakeValidationError},
    orchestrator::{FileOutcome, UploadOrchestrator},
    services::{DocumentStorage, IntakeRecords},
    session::UploadSession,
};

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub submission_id: String,
    pub uploaded: usize,
    pub failed: usize,
    pub files: Vec<FileOutcome>,
}

/// Validates the identity form, creates the submission and hands the queued
/// documents to the orchestrator.
pub struct IntakeController {
    records: Arc<dyn IntakeRecords>,
    orchestrator: UploadOrchestrator,
    rules: IntakeRules,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the submit ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl IntakeController {
    pub fn new(
        storage: Arc<dyn DocumentStorage>,
        records: Arc<dyn IntakeRecords>,
        config: &AppConfig,
    ) -> Self {
        let orchestrator =
            UploadOrchestrator::new(storage, Arc::clone(&records), config.batch_policy);
        Self::with_parts(records, orchestrator, IntakeRules::from_config(config))
    }

    pub fn with_parts(
        records: Arc<dyn IntakeRecords>,
        orchestrator: UploadOrchestrator,
        rules: IntakeRules,
    ) -> Self {
        Self {
            records,
            orchestrator,
            rules,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn rules(&self) -> &IntakeRules {
        &self.rules
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn submit(
        &self,
        form: &IntakeForm,
        session: &Mutex<UploadSession>,
    ) -> Result<SubmissionReceipt, IntakeError> {
        self.submit_on(form, session, Utc::now().date_naive()).await
    }

    /// Runs one submit against a fixed calendar date.
    ///
    /// Validation failures and a failed submission insert leave the session untouched.
    /// When every document uploads, the session is cleared for the next patient.
    pub async fn submit_on(
        &self,
        form: &IntakeForm,
        session: &Mutex<UploadSession>,
        today: NaiveDate,
    ) -> Result<SubmissionReceipt, IntakeError> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return Err(IntakeError::SubmitInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let identity = form.validate(&self.rules, today)?;
        if session.lock().await.is_empty() {
            return Err(IntakeValidationError::NoDocuments.into());
        }

        let submission = self
            .records
            .create_submission(identity.into_submission())
            .await
            .map_err(|err| {
                error!(error = %err, "Failed to create patient submission");
                IntakeError::SubmissionFailed(err)
            })?;
        info!(submission_id = %submission.id, "Created patient submission");

        let report = self.orchestrator.upload_all(&submission.id, session).await?;
        if report.failed == 0 {
            session.lock().await.reset();
        }

        Ok(SubmissionReceipt {
            submission_id: submission.id,
            uploaded: report.uploaded,
            failed: report.failed,
            files: report.files,
        })
    }
}
