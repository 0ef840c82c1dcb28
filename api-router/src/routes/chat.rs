use std::{convert::Infallible, time::Duration};

use async_openai::{
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
};
use async_stream::stream;
use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
    Json,
};
use common::{error::AppError, storage::types::triage_settings::TriageSettings};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub messages: Vec<ChatTurn>,
}

/// Forwards the conversation upstream with the triage prompt prepended and relays the
/// answer as server-sent events in the upstream chunk format, ending with `[DONE]`.
pub async fn ai_chat(
    State(state): State<ApiState>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if body.messages.is_empty() {
        return Err(ApiError::ValidationError(
            "At least one message is required".to_string(),
        ));
    }

    let settings = current_settings(&state).await?;
    let request = create_chat_request(&settings, body.messages).map_err(AppError::from)?;

    let mut upstream = state
        .openai_client
        .chat()
        .create_stream(request)
        .await
        .map_err(|err| {
            error!(error = %err, "Failed to open upstream chat stream");
            ApiError::InternalError("Failed to get response".to_string())
        })?;

    info!(
        model = %settings.model,
        prompt_version = %settings.prompt_version,
        "Chat stream started"
    );

    let events = stream! {
        while let Some(item) = upstream.next().await {
            match item {
                Ok(chunk) => {
                    let content = chunk
                        .choices
                        .first()
                        .and_then(|choice| choice.delta.content.clone())
                        .unwrap_or_default();
                    if !content.is_empty() {
                        yield Ok(delta_event(&content));
                    }
                }
                Err(err) => {
                    warn!(error = %err, "Upstream chat stream failed");
                    yield Ok(Event::default().event("error").data(format!("Stream error: {err}")));
                    break;
                }
            }
        }
        yield Ok(Event::default().data("[DONE]"));
    };

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

/// Stored triage settings, seeding them from configuration when the row is missing.
async fn current_settings(state: &ApiState) -> Result<TriageSettings, AppError> {
    match TriageSettings::get_current(&state.db).await {
        Ok(settings) => Ok(settings),
        Err(AppError::NotFound(_)) => {
            let seed = TriageSettings::from_config(&state.config).await?;
            TriageSettings::sync(&state.db, seed).await
        }
        Err(err) => Err(err),
    }
}

pub fn create_chat_request(
    settings: &TriageSettings,
    turns: Vec<ChatTurn>,
) -> Result<CreateChatCompletionRequest, OpenAIError> {
    let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(turns.len().saturating_add(1));
    messages.push(ChatCompletionRequestSystemMessage::from(settings.system_prompt.clone()).into());
    for turn in turns {
        let message = match turn.role {
            ChatRole::User => ChatCompletionRequestUserMessage::from(turn.content).into(),
            ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(turn.content)
                .build()?
                .into(),
        };
        messages.push(message);
    }

    CreateChatCompletionRequestArgs::default()
        .model(&settings.model)
        .temperature(settings.temperature)
        .max_completion_tokens(settings.max_tokens)
        .stream(true)
        .messages(messages)
        .build()
}

fn delta_event(content: &str) -> Event {
    Event::default().data(json!({ "choices": [{ "delta": { "content": content } }] }).to_string())
}
