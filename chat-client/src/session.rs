use std::{path::Path, sync::Arc};

use common::utils::pdf_text::PdfLimits;
use event_stream_decoder::EventStreamDecoder;
use futures::StreamExt;
use reqwest::{header::CONTENT_TYPE, Response};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    attachment::PendingAttachment,
    config::ChatClientConfig,
    error::ChatError,
    message::{ChatMessage, ChatReply, ChatRequest},
    transcript_store::TranscriptStore,
};

const STREAM_CONTENT_TYPES: [&str; 2] = ["text/event-stream", "text/stream"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatState {
    Idle,
    AwaitingResponse,
    Streaming,
    Error,
}

/// A conversation with the chat endpoint, persisted after every change.
pub struct ChatSession {
    http: reqwest::Client,
    endpoint: String,
    limits: PdfLimits,
    store: Arc<dyn TranscriptStore>,
    messages: Vec<ChatMessage>,
    state: ChatState,
    last_error: Option<String>,
    attachment: Option<PendingAttachment>,
}

impl ChatSession {
    /// Restores the stored transcript. A transcript that cannot be read is
    /// logged and replaced by an empty one.
    pub async fn open(config: &ChatClientConfig, store: Arc<dyn TranscriptStore>) -> Self {
        let messages = match store.load().await {
            Ok(messages) => messages,
            Err(err) => {
                warn!(error = %err, "Discarding unreadable transcript");
                Vec::new()
            }
        };
        debug!(messages = messages.len(), "Opened chat session");

        Self {
            http: reqwest::Client::new(),
            endpoint: config.chat_endpoint.clone(),
            limits: PdfLimits {
                max_bytes: config.attachment_max_bytes,
            },
            store,
            messages,
            state: ChatState::Idle,
            last_error: None,
            attachment: None,
        }
    }

    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn can_submit(&self) -> bool {
        !matches!(
            self.state,
            ChatState::AwaitingResponse | ChatState::Streaming
        )
    }

    pub fn pending_attachment(&self) -> Option<&PendingAttachment> {
        self.attachment.as_ref()
    }

    pub fn clear_attachment(&mut self) {
        self.attachment = None;
    }

    /// Extracts a PDF to send with the next message. Any failure clears the
    /// pending attachment.
    pub async fn attach_pdf(
        &mut self,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<&PendingAttachment, ChatError> {
        self.attachment = None;
        let attachment =
            PendingAttachment::from_pdf(file_name, mime_type, bytes, self.limits).await?;
        Ok(self.attachment.insert(attachment))
    }

    pub async fn attach_file(&mut self, path: &Path) -> Result<&PendingAttachment, ChatError> {
        self.attachment = None;
        let attachment = PendingAttachment::from_path(path, self.limits).await?;
        Ok(self.attachment.insert(attachment))
    }

    /// Clears the conversation here and in the store.
    pub async fn reset(&mut self) -> Result<(), ChatError> {
        self.messages.clear();
        self.attachment = None;
        self.state = ChatState::Idle;
        self.last_error = None;
        self.store.clear().await?;
        Ok(())
    }

    /// Sends `input` (plus any pending attachment) with the whole transcript and
    /// collects the answer.
    ///
    /// `on_update` sees the assistant entry every time its text grows. On failure the
    /// transcript keeps everything received so far and the session moves to
    /// [`ChatState::Error`]; submitting again starts a fresh exchange.
    pub async fn submit<F>(&mut self, input: &str, mut on_update: F) -> Result<ChatMessage, ChatError>
    where
        F: FnMut(&ChatMessage) + Send,
    {
        if !self.can_submit() {
            return Err(ChatError::InFlight);
        }

        let input = input.trim();
        let attachment = self.attachment.take();
        let message = match &attachment {
            Some(attachment) => ChatMessage::user(attachment.payload_for(input))
                .with_display(attachment.display_for(input)),
            None if input.is_empty() => return Err(ChatError::EmptyInput),
            None => ChatMessage::user(input),
        };

        self.messages.push(message);
        self.state = ChatState::AwaitingResponse;
        self.last_error = None;
        let result = match self.persist().await {
            Ok(()) => self.exchange(&mut on_update).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(reply) => {
                self.state = ChatState::Idle;
                Ok(reply)
            }
            Err(err) => {
                error!(error = %err, "Chat exchange failed");
                self.state = ChatState::Error;
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn exchange<F>(&mut self, on_update: &mut F) -> Result<ChatMessage, ChatError>
    where
        F: FnMut(&ChatMessage) + Send,
    {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&ChatRequest::from_transcript(&self.messages))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if is_stream(&response) {
            self.receive_stream(response, on_update).await
        } else {
            let reply: ChatReply = response
                .json()
                .await
                .map_err(|err| ChatError::Decode(err.to_string()))?;
            let message = ChatMessage::assistant(reply.content);
            self.messages.push(message.clone());
            self.persist().await?;
            on_update(&message);
            Ok(message)
        }
    }

    async fn receive_stream<F>(
        &mut self,
        response: Response,
        on_update: &mut F,
    ) -> Result<ChatMessage, ChatError>
    where
        F: FnMut(&ChatMessage) + Send,
    {
        self.state = ChatState::Streaming;
        self.messages.push(ChatMessage::assistant(String::new()));
        self.persist().await?;

        let mut decoder = EventStreamDecoder::new();
        let mut accumulated = String::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let deltas = match chunk {
                Ok(chunk) => decoder.push(&chunk),
                Err(err) => {
                    self.persist().await?;
                    return Err(err.into());
                }
            };
            self.apply_deltas(&mut accumulated, deltas, on_update).await?;
            if let Some(upstream) = decoder.take_errors().into_iter().next() {
                return Err(ChatError::Upstream(upstream));
            }
        }

        let tail = decoder.finish();
        self.apply_deltas(&mut accumulated, tail, on_update).await?;
        if let Some(upstream) = decoder.take_errors().into_iter().next() {
            return Err(ChatError::Upstream(upstream));
        }

        info!(chars = accumulated.len(), "Chat response complete");
        Ok(ChatMessage::assistant(accumulated))
    }

    /// Appends deltas to the accumulator and replaces the last entry with the result.
    async fn apply_deltas<F>(
        &mut self,
        accumulated: &mut String,
        deltas: Vec<String>,
        on_update: &mut F,
    ) -> Result<(), ChatError>
    where
        F: FnMut(&ChatMessage) + Send,
    {
        if deltas.is_empty() {
            return Ok(());
        }
        for delta in deltas {
            accumulated.push_str(&delta);
        }

        let updated = ChatMessage::assistant(accumulated.clone());
        on_update(&updated);
        if let Some(last) = self.messages.last_mut() {
            *last = updated;
        }
        self.persist().await
    }

    async fn persist(&self) -> Result<(), ChatError> {
        self.store.save(&self.messages).await?;
        Ok(())
    }
}

fn is_stream(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            let value = value.to_ascii_lowercase();
            STREAM_CONTENT_TYPES
                .iter()
                .any(|stream_type| value.contains(stream_type))
        })
}
