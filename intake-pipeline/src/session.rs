use std::collections::HashMap;

use bytes::Bytes;
use common::{
    storage::types::patient_document::UploadStatus,
    utils::{
        config::{AppConfig, SubtypeSelection},
        upload_limits::{resolve_mime_type, UploadPolicy, UploadValidationError},
    },
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{IntakeError, UploadErrorKind},
    sections::Section,
};

/// A file as handed over by the caller, before it joins a section.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub payload: Bytes,
}

impl IncomingFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, payload: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub id: String,
    pub section: Section,
    pub subtype: String,
    pub file_name: String,
    pub mime_type: String,
    pub size: usize,
    #[serde(skip)]
    pub payload: Bytes,
    pub status: UploadStatus,
    pub error: Option<String>,
    pub error_kind: Option<UploadErrorKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedFile {
    pub file_name: String,
    pub kind: UploadErrorKind,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AddOutcome {
    pub added: Vec<String>,
    pub rejected: Vec<RejectedFile>,
}

/// Per-form upload state: the files queued in every section and each section's
/// currently selected subtype.
#[derive(Debug, Clone)]
pub struct UploadSession {
    policy: UploadPolicy,
    selection: SubtypeSelection,
    selected: HashMap<Section, &'static str>,
    files: Vec<UploadedFile>,
}

impl UploadSession {
    pub fn new(policy: UploadPolicy, selection: SubtypeSelection) -> Self {
        Self {
            policy,
            selection,
            selected: HashMap::new(),
            files: Vec::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(UploadPolicy::from_config(config), config.subtype_selection)
    }

    pub fn select_subtype(&mut self, section: Section, subtype: &str) -> Result<(), IntakeError> {
        let canonical =
            section
                .canonical_subtype(subtype)
                .ok_or_else(|| IntakeError::UnknownSubtype {
                    section,
                    subtype: subtype.to_string(),
                })?;
        self.selected.insert(section, canonical);
        Ok(())
    }

    pub fn selected_subtype(&self, section: Section) -> Option<&'static str> {
        self.selected.get(&section).copied()
    }

    /// Queues files under the section's selected subtype.
    ///
    /// Without a selection nothing is added. Files failing the upload policy are
    /// reported in the outcome and left out.
    pub fn add_files(
        &mut self,
        section: Section,
        incoming: Vec<IncomingFile>,
    ) -> Result<AddOutcome, IntakeError> {
        let Some(subtype) = self.selected_subtype(section) else {
            return Err(IntakeError::NoSubtypeSelected(section));
        };

        let mut outcome = AddOutcome::default();
        for file in incoming {
            let mime_type = resolve_mime_type(file.content_type.as_deref(), &file.file_name);
            if let Err(err) = self.policy.validate(&mime_type, file.payload.len()) {
                let kind = match err {
                    UploadValidationError::UnsupportedMimeType(_) => {
                        UploadErrorKind::UnsupportedMimeType
                    }
                    UploadValidationError::FileTooLarge { .. } => UploadErrorKind::FileTooLarge,
                };
                debug!(file_name = %file.file_name, %mime_type, error = %err, "Filtered upload");
                outcome.rejected.push(RejectedFile {
                    file_name: file.file_name,
                    kind,
                    reason: err.to_string(),
                });
                continue;
            }

            let id = Uuid::new_v4().to_string();
            outcome.added.push(id.clone());
            self.files.push(UploadedFile {
                id,
                section,
                subtype: subtype.to_string(),
                file_name: file.file_name,
                mime_type,
                size: file.payload.len(),
                payload: file.payload,
                status: UploadStatus::Pending,
                error: None,
                error_kind: None,
            });
        }

        if self.selection == SubtypeSelection::ResetAfterAdd {
            self.selected.remove(&section);
        }

        Ok(outcome)
    }

    pub fn remove_file(&mut self, id: &str) -> Result<UploadedFile, IntakeError> {
        let position = self
            .files
            .iter()
            .position(|file| file.id == id)
            .ok_or_else(|| IntakeError::UnknownFile(id.to_string()))?;
        Ok(self.files.remove(position))
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn section_files(&self, section: Section) -> impl Iterator<Item = &UploadedFile> {
        self.files.iter().filter(move |file| file.section == section)
    }

    pub fn file(&self, id: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|file| file.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Marks every file pending again and returns a snapshot to upload.
    pub fn begin_batch(&mut self) -> Vec<UploadedFile> {
        for file in &mut self.files {
            file.status = UploadStatus::Pending;
            file.error = None;
            file.error_kind = None;
        }
        self.files.clone()
    }

    pub fn mark_uploaded(&mut self, id: &str) -> bool {
        self.update(id, UploadStatus::Uploaded, None)
    }

    pub fn mark_failed(&mut self, id: &str, kind: UploadErrorKind, reason: String) -> bool {
        self.update(id, UploadStatus::Error, Some((kind, reason)))
    }

    fn update(
        &mut self,
        id: &str,
        status: UploadStatus,
        failure: Option<(UploadErrorKind, String)>,
    ) -> bool {
        let Some(file) = self.files.iter_mut().find(|file| file.id == id) else {
            return false;
        };
        file.status = status;
        match failure {
            Some((kind, reason)) => {
                file.error_kind = Some(kind);
                file.error = Some(reason);
            }
            None => {
                file.error_kind = None;
                file.error = None;
            }
        }
        true
    }

    pub fn count_with_status(&self, status: UploadStatus) -> usize {
        self.files
            .iter()
            .filter(|file| file.status == status)
            .count()
    }

    pub fn reset(&mut self) {
        self.files.clear();
        self.selected.clear();
    }
}
