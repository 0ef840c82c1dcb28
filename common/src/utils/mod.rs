pub mod config;
pub mod pdf_text;
pub mod upload_limits;
