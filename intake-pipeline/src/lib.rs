#![allow(clippy::missing_docs_in_private_items)]

pub mod controller;
pub mod error;
pub mod form;
pub mod orchestrator;
pub mod sections;
pub mod services;
pub mod session;

pub use controller::{IntakeController, SubmissionReceipt};
pub use error::{IntakeError, UploadErrorKind};
pub use form::{format_phone_number, IntakeForm, IntakeRules, IntakeValidationError};
pub use orchestrator::{BatchReport, FileOutcome, UploadOrchestrator};
pub use sections::Section;
pub use services::{DocumentStorage, IntakeRecords};
pub use session::{AddOutcome, IncomingFile, UploadSession, UploadedFile};
