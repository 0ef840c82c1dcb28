use thiserror::Error;

use super::config::AppConfig;

/// MIME types accepted for provider document uploads.
pub const ACCEPTED_UPLOAD_MIME_TYPES: [&str; 5] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/jpeg",
    "image/png",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadValidationError {
    #[error("Unsupported file type: {0}")]
    UnsupportedMimeType(String),
    #[error("File is too large ({size} bytes). Maximum allowed is {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },
}

/// Upload policy derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_file_bytes: usize,
    pub filter_unsupported: bool,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl UploadPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_file_bytes: config.upload_max_file_bytes,
            filter_unsupported: config.upload_filter_unsupported,
        }
    }

    pub fn validate(&self, mime_type: &str, size: usize) -> Result<(), UploadValidationError> {
        if self.filter_unsupported && !is_accepted_mime_type(mime_type) {
            return Err(UploadValidationError::UnsupportedMimeType(
                mime_type.to_string(),
            ));
        }

        if size > self.max_file_bytes {
            return Err(UploadValidationError::FileTooLarge {
                size,
                limit: self.max_file_bytes,
            });
        }

        Ok(())
    }
}

/// Compares on the essence of the MIME type so parameters like `charset` are ignored.
pub fn is_accepted_mime_type(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_UPLOAD_MIME_TYPES.contains(&essence.as_str())
}

/// Resolves the MIME type of an upload, preferring the declared content type and
/// falling back to the file extension.
pub fn resolve_mime_type(declared: Option<&str>, file_name: &str) -> String {
    declared
        .map(str::trim)
        .filter(|value| {
            !value.is_empty() && *value != mime::APPLICATION_OCTET_STREAM.essence_str()
        })
        .map_or_else(
            || {
                mime_guess::from_path(file_name)
                    .first_or(mime::APPLICATION_OCTET_STREAM)
                    .to_string()
            },
            ToString::to_string,
        )
}
