use common::utils::config::DEFAULT_MAX_FILE_BYTES;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
pub struct ChatClientConfig {
    #[serde(default = "default_chat_endpoint")]
    pub chat_endpoint: String,
    #[serde(default = "default_transcript_path")]
    pub transcript_path: String,
    #[serde(default = "default_attachment_max_bytes")]
    pub attachment_max_bytes: usize,
}

fn default_chat_endpoint() -> String {
    "http://localhost:3000/api/v1/ai-chat".to_string()
}

fn default_transcript_path() -> String {
    "./data/chat-transcript.json".to_string()
}

fn default_attachment_max_bytes() -> usize {
    DEFAULT_MAX_FILE_BYTES
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self {
            chat_endpoint: default_chat_endpoint(),
            transcript_path: default_transcript_path(),
            attachment_max_bytes: default_attachment_max_bytes(),
        }
    }
}

pub fn get_chat_config() -> Result<ChatClientConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("chat-client").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_server() {
        let config = ChatClientConfig::default();

        assert_eq!(config.chat_endpoint, "http://localhost:3000/api/v1/ai-chat");
        assert_eq!(config.attachment_max_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn partial_source_fills_in_defaults() {
        let config: ChatClientConfig = Config::builder()
            .set_override("transcript_path", "/tmp/transcript.json")
            .expect("override")
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");

        assert_eq!(config.transcript_path, "/tmp/transcript.json");
        assert_eq!(config.chat_endpoint, default_chat_endpoint());
    }
}
