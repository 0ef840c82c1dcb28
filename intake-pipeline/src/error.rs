use std::fmt;

use common::error::AppError;
use serde::Serialize;
use thiserror::Error;

use crate::{form::IntakeValidationError, sections::Section};

/// Why a single file did not make it into storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadErrorKind {
    NoSubtypeSelected,
    UnsupportedMimeType,
    FileTooLarge,
    StorageUploadFailure,
    MetadataInsertFailure,
}

impl UploadErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadErrorKind::NoSubtypeSelected => "no-subtype-selected",
            UploadErrorKind::UnsupportedMimeType => "unsupported-mime-type",
            UploadErrorKind::FileTooLarge => "file-too-large",
            UploadErrorKind::StorageUploadFailure => "storage-upload-failure",
            UploadErrorKind::MetadataInsertFailure => "metadata-insert-failure",
        }
    }
}

impl fmt::Display for UploadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Select a document type for {0} before adding files")]
    NoSubtypeSelected(Section),
    #[error("{subtype} is not a document type of {section}")]
    UnknownSubtype { section: Section, subtype: String },
    #[error("Unknown document section: {0}")]
    UnknownSection(String),
    #[error("File {0} is not part of this upload")]
    UnknownFile(String),
    #[error(transparent)]
    Validation(#[from] IntakeValidationError),
    #[error("A submission is already in progress")]
    SubmitInFlight,
    #[error("Failed to submit. Please try again.")]
    SubmissionFailed(#[source] AppError),
    #[error("Upload failed for {file_name}: {kind}")]
    BatchAborted {
        file_name: String,
        kind: UploadErrorKind,
    },
}
