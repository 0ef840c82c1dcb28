#![allow(clippy::missing_docs_in_private_items)]

pub mod attachment;
pub mod config;
pub mod error;
pub mod message;
pub mod session;
pub mod transcript_store;

pub use attachment::{AttachmentError, PendingAttachment};
pub use config::{get_chat_config, ChatClientConfig};
pub use error::ChatError;
pub use message::{ChatMessage, ChatRole};
pub use session::{ChatSession, ChatState};
pub use transcript_store::{
    InMemoryTranscriptStore, JsonFileTranscriptStore, TranscriptError, TranscriptStore,
};
