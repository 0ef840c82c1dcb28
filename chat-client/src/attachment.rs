use std::path::Path;

use common::utils::pdf_text::{extract_pdf_text, PdfLimits, PdfTextError};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error(transparent)]
    Pdf(#[from] PdfTextError),
    #[error("Failed to read attachment: {0}")]
    Io(#[from] std::io::Error),
}

/// Text of a PDF waiting to ride along with the next message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAttachment {
    pub file_name: String,
    pub page_count: usize,
    pub text: String,
}

impl PendingAttachment {
    pub async fn from_pdf(
        file_name: impl Into<String>,
        mime_type: &str,
        bytes: Vec<u8>,
        limits: PdfLimits,
    ) -> Result<Self, AttachmentError> {
        let file_name = file_name.into();
        let extracted = extract_pdf_text(bytes, mime_type, limits).await?;
        info!(%file_name, pages = extracted.page_count, "Extracted attachment text");

        Ok(Self {
            file_name,
            page_count: extracted.page_count,
            text: extracted.text,
        })
    }

    /// Reads a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path, limits: PdfLimits) -> Result<Self, AttachmentError> {
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        if mime_type != "application/pdf" {
            return Err(PdfTextError::UnsupportedType(mime_type).into());
        }

        let size = tokio::fs::metadata(path).await?.len();
        let size = usize::try_from(size).unwrap_or(usize::MAX);
        if size > limits.max_bytes {
            return Err(PdfTextError::TooLarge {
                size,
                limit: limits.max_bytes,
            }
            .into());
        }

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "attachment.pdf".to_string(), |name| name.to_string_lossy().into_owned());
        Self::from_pdf(file_name, &mime_type, bytes, limits).await
    }

    /// Content sent to the endpoint for `input`: the typed text followed by the
    /// extracted document.
    pub fn payload_for(&self, input: &str) -> String {
        let header = format!(
            "[Attached PDF: {} ({} pages)]",
            self.file_name, self.page_count
        );
        if input.is_empty() {
            format!("{header}\n{}", self.text)
        } else {
            format!("{input}\n\n{header}\n{}", self.text)
        }
    }

    /// What the transcript shows instead of the raw document text.
    pub fn display_for(&self, input: &str) -> String {
        let marker = format!("[Attached PDF: {}]", self.file_name);
        if input.is_empty() {
            marker
        } else {
            format!("{input}\n\n{marker}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::utils::pdf_text::testing::build_pdf;

    #[tokio::test]
    async fn extracts_pdf_and_builds_both_message_forms() {
        let pdf = build_pdf(&["Chest pain since Monday", "ECG normal"]).expect("pdf");

        let attachment =
            PendingAttachment::from_pdf("ecg.pdf", "application/pdf", pdf, PdfLimits::default())
                .await
                .expect("extract");

        assert_eq!(attachment.page_count, 2);
        let payload = attachment.payload_for("Please review");
        assert!(payload.starts_with("Please review\n\n[Attached PDF: ecg.pdf (2 pages)]\n"));
        assert!(payload.contains("Chest pain"));
        let display = attachment.display_for("Please review");
        assert_eq!(display, "Please review\n\n[Attached PDF: ecg.pdf]");
        assert!(!display.contains("Chest pain"));
    }

    #[tokio::test]
    async fn rejects_non_pdf_before_reading() {
        let result = PendingAttachment::from_pdf(
            "photo.png",
            "image/png",
            b"\x89PNG".to_vec(),
            PdfLimits::default(),
        )
        .await;

        assert!(matches!(
            result,
            Err(AttachmentError::Pdf(PdfTextError::UnsupportedType(_)))
        ));
    }

    #[tokio::test]
    async fn from_path_checks_extension_and_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let text_file = dir.path().join("notes.txt");
        std::fs::write(&text_file, b"plain").expect("write");
        let pdf_file = dir.path().join("scan.pdf");
        std::fs::write(&pdf_file, build_pdf(&["Scan"]).expect("pdf")).expect("write");

        let wrong_type = PendingAttachment::from_path(&text_file, PdfLimits::default()).await;
        assert!(matches!(
            wrong_type,
            Err(AttachmentError::Pdf(PdfTextError::UnsupportedType(_)))
        ));

        let too_large = PendingAttachment::from_path(&pdf_file, PdfLimits { max_bytes: 8 }).await;
        assert!(matches!(
            too_large,
            Err(AttachmentError::Pdf(PdfTextError::TooLarge { .. }))
        ));

        let ok = PendingAttachment::from_path(&pdf_file, PdfLimits::default())
            .await
            .expect("extract");
        assert_eq!(ok.file_name, "scan.pdf");
    }
}
