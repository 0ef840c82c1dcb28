use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One transcript entry.
///
/// `content` is what the endpoint receives, attachment text included.
/// `display_content` is the shorter form shown to the user when it differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_content: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            display_content: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            display_content: None,
        }
    }

    #[must_use]
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display_content = Some(display.into());
        self
    }

    pub fn display(&self) -> &str {
        self.display_content.as_deref().unwrap_or(&self.content)
    }
}

/// Message shape sent over the wire.
#[derive(Debug, Clone, Serialize)]
pub struct WireMessage<'a> {
    pub role: ChatRole,
    pub content: &'a str,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        Self {
            role: message.role,
            content: &message.content,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub messages: Vec<WireMessage<'a>>,
}

impl<'a> ChatRequest<'a> {
    pub fn from_transcript(messages: &'a [ChatMessage]) -> Self {
        Self {
            messages: messages.iter().map(WireMessage::from).collect(),
        }
    }
}

/// Non-streaming answer of the chat endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatReply {
    pub content: String,
}
