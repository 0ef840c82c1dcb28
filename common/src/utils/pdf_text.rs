use lopdf::Document;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, warn};

use super::config::{AppConfig, DEFAULT_MAX_FILE_BYTES};

const PAGE_SEPARATOR: &str = "\n\n";

#[derive(Error, Debug)]
pub enum PdfTextError {
    #[error("Only PDF files can be attached, got {0}")]
    UnsupportedType(String),
    #[error("PDF is too large ({size} bytes). Maximum allowed is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("Failed to read PDF: {0}")]
    Extraction(String),
    #[error("PDF contains no extractable text")]
    Empty,
    #[error("PDF extraction task failed: {0}")]
    Join(#[from] JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfLimits {
    pub max_bytes: usize,
}

impl Default for PdfLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl PdfLimits {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_bytes: config.attachment_max_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPdf {
    pub page_count: usize,
    pub text: String,
}

/// Extracts the text layer of a PDF, one block per non-blank page.
///
/// The MIME type and size are checked before any parsing happens. Pages are read with
/// `lopdf`; when no page yields text through it, the whole document is handed to
/// `pdf-extract` instead.
pub async fn extract_pdf_text(
    bytes: Vec<u8>,
    mime_type: &str,
    limits: PdfLimits,
) -> Result<ExtractedPdf, PdfTextError> {
    if !is_pdf(mime_type) {
        return Err(PdfTextError::UnsupportedType(mime_type.to_string()));
    }

    if bytes.len() > limits.max_bytes {
        return Err(PdfTextError::TooLarge {
            size: bytes.len(),
            limit: limits.max_bytes,
        });
    }

    let extracted = tokio::task::spawn_blocking(move || extract_blocking(&bytes)).await??;
    if extracted.text.is_empty() {
        return Err(PdfTextError::Empty);
    }

    debug!(
        page_count = extracted.page_count,
        chars = extracted.text.len(),
        "Extracted PDF text"
    );
    Ok(extracted)
}

fn is_pdf(mime_type: &str) -> bool {
    mime_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/pdf"))
}

fn extract_blocking(bytes: &[u8]) -> Result<ExtractedPdf, PdfTextError> {
    let document = Document::load_mem(bytes)
        .map_err(|err| PdfTextError::Extraction(format!("Failed to parse PDF: {err}")))?;

    let mut page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();
    let page_count = page_numbers.len();

    let mut pages = Vec::with_capacity(page_count);
    let mut failed = 0usize;
    for page in &page_numbers {
        match document.extract_text(&[*page]) {
            Ok(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    pages.push(trimmed.to_string());
                }
            }
            Err(err) => {
                warn!(page, error = %err, "Failed to extract text from PDF page");
                failed += 1;
            }
        }
    }

    if page_count > 0 && failed == page_count {
        return fallback_whole_document(bytes, page_count);
    }

    Ok(ExtractedPdf {
        page_count,
        text: pages.join(PAGE_SEPARATOR),
    })
}

fn fallback_whole_document(bytes: &[u8], page_count: usize) -> Result<ExtractedPdf, PdfTextError> {
    debug!(page_count, "Falling back to whole-document PDF extraction");
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|err| PdfTextError::Extraction(format!("Failed to extract text: {err}")))?;

    let text = text
        .split('\u{c}')
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR);

    Ok(ExtractedPdf { page_count, text })
}

/// Small PDF builder for tests in this and dependent crates.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use lopdf::{
        content::{Content, Operation},
        dictionary, Document, Object, Stream,
    };

    /// Builds a PDF with one page per entry; an empty entry produces a page without text.
    pub fn build_pdf(pages: &[&str]) -> Result<Vec<u8>, lopdf::Error> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for text in pages {
            let operations = if text.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 14.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)?;
        Ok(buffer)
    }
}
