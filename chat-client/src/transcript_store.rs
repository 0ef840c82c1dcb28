use std::{
    io::Write,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::{sync::Mutex, task::JoinError};
use tracing::debug;

use crate::message::ChatMessage;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("Transcript I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Transcript is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Transcript task failed: {0}")]
    Join(#[from] JoinError),
}

/// Durable home of a chat transcript.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Returns the stored transcript, or an empty one when nothing was saved yet.
    async fn load(&self) -> Result<Vec<ChatMessage>, TranscriptError>;
    async fn save(&self, messages: &[ChatMessage]) -> Result<(), TranscriptError>;
    async fn clear(&self) -> Result<(), TranscriptError>;
}

/// Keeps the transcript as a JSON array in a single file.
///
/// Saves go to a temporary file in the same directory which is then renamed over the
/// target, so a crash mid-write leaves the previous transcript intact.
#[derive(Debug, Clone)]
pub struct JsonFileTranscriptStore {
    path: PathBuf,
}

impl JsonFileTranscriptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TranscriptStore for JsonFileTranscriptStore {
    async fn load(&self) -> Result<Vec<ChatMessage>, TranscriptError> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, messages: &[ChatMessage]) -> Result<(), TranscriptError> {
        let json = serde_json::to_vec_pretty(messages)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> Result<(), TranscriptError> {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            std::fs::create_dir_all(&dir)?;

            let mut staged = NamedTempFile::new_in(&dir)?;
            staged.write_all(&json)?;
            staged.as_file().sync_all()?;
            staged.persist(&path).map_err(|err| err.error)?;
            Ok(())
        })
        .await??;

        debug!(path = %self.path.display(), messages = messages.len(), "Saved transcript");
        Ok(())
    }

    async fn clear(&self) -> Result<(), TranscriptError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTranscriptStore {
    messages: Mutex<Vec<ChatMessage>>,
}

impl InMemoryTranscriptStore {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages: Mutex::new(messages),
        }
    }

    pub async fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn load(&self) -> Result<Vec<ChatMessage>, TranscriptError> {
        Ok(self.snapshot().await)
    }

    async fn save(&self, messages: &[ChatMessage]) -> Result<(), TranscriptError> {
        *self.messages.lock().await = messages.to_vec();
        Ok(())
    }

    async fn clear(&self) -> Result<(), TranscriptError> {
        self.messages.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn json_file_round_trip_keeps_display_variant() {
        let dir = tempdir().expect("tempdir");
        let store = JsonFileTranscriptStore::new(dir.path().join("nested").join("chat.json"));
        let transcript = vec![
            ChatMessage::user("question\n\nattached text").with_display("question [scan.pdf]"),
            ChatMessage::assistant("answer"),
        ];

        assert!(store.load().await.expect("load missing").is_empty());
        store.save(&transcript).await.expect("save");
        let reopened = JsonFileTranscriptStore::new(store.path().to_path_buf());

        assert_eq!(reopened.load().await.expect("load"), transcript);
    }

    #[tokio::test]
    async fn save_replaces_previous_content_and_clear_removes_file() {
        let dir = tempdir().expect("tempdir");
        let store = JsonFileTranscriptStore::new(dir.path().join("chat.json"));

        store
            .save(&[ChatMessage::user("first"), ChatMessage::assistant("reply")])
            .await
            .expect("save");
        store
            .save(&[ChatMessage::user("only")])
            .await
            .expect("save again");
        assert_eq!(store.load().await.expect("load").len(), 1);

        let leftovers = std::fs::read_dir(dir.path()).expect("read dir").count();
        assert_eq!(leftovers, 1);

        store.clear().await.expect("clear");
        store.clear().await.expect("clear twice");
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("chat.json");
        std::fs::write(&path, b"{not json").expect("write");

        let result = JsonFileTranscriptStore::new(path).load().await;

        assert!(matches!(result, Err(TranscriptError::Json(_))));
    }
}
