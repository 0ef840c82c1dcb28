use thiserror::Error;

use crate::{attachment::AttachmentError, transcript_store::TranscriptError};

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Type a message or attach a document first")]
    EmptyInput,
    #[error("A response is still in progress")]
    InFlight,
    #[error("Failed to get response: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Failed to get response: chat endpoint answered {status}")]
    Status { status: u16, body: String },
    #[error("Could not read the chat response: {0}")]
    Decode(String),
    #[error("The assistant reported an error: {0}")]
    Upstream(String),
    #[error("Failed to save the transcript: {0}")]
    Persistence(#[from] TranscriptError),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
}
