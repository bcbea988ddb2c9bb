//! OpenAI chat completions wire format. Serves both OpenAI and DeepSeek,
//! which differ only in base URL and default model.

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::sse::{data_lines, ensure_success, upstream_events, DONE_SENTINEL};
use super::{ChatBackend, ConversationTurn, Dispatch, RelayError, Role, TextStream, MAX_TOKENS};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

impl ChatCompletionChunk {
    fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|text| !text.is_empty())
    }
}

fn build_messages<'a>(system_prompt: &'a str, turns: &'a [ConversationTurn]) -> Vec<ChatMessage<'a>> {
    let mut messages = Vec::with_capacity(turns.len() + 1);
    messages.push(ChatMessage {
        role: "system",
        content: system_prompt,
    });
    messages.extend(turns.iter().map(|turn| ChatMessage {
        role: match turn.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        },
        content: &turn.content,
    }));
    messages
}

pub(super) struct OpenAiCompatibleBackend;

#[async_trait::async_trait]
impl ChatBackend for OpenAiCompatibleBackend {
    async fn open(
        &self,
        http: &Client,
        dispatch: &Dispatch,
        system_prompt: &str,
        turns: &[ConversationTurn],
    ) -> Result<TextStream, RelayError> {
        let vendor = dispatch.provider.label();
        let body = ChatCompletionRequest {
            model: &dispatch.model,
            stream: true,
            messages: build_messages(system_prompt, turns),
            max_tokens: MAX_TOKENS,
        };

        let response = http
            .post(format!("{}/chat/completions", dispatch.base_url))
            .bearer_auth(&dispatch.api_key)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response, vendor).await?;

        let mut events = upstream_events(response);
        let stream = async_stream::stream! {
            'events: while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                };
                for data in data_lines(&event) {
                    if data == DONE_SENTINEL {
                        break 'events;
                    }
                    match serde_json::from_str::<ChatCompletionChunk>(data) {
                        Ok(chunk) => {
                            if let Some(text) = chunk.into_text() {
                                yield Ok(text);
                            }
                        }
                        Err(err) => trace!("Skipping unparsable {vendor} line: {err}"),
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_extracts_delta_content() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"index":0,"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(chunk.into_text().as_deref(), Some("Hi"));
    }

    #[test]
    fn test_role_only_chunk_has_no_text() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(chunk.into_text(), None);
    }

    #[test]
    fn test_empty_choices_has_no_text() {
        let chunk: ChatCompletionChunk = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(chunk.into_text(), None);
    }

    #[test]
    fn test_system_prompt_leads_messages() {
        let turns = vec![
            ConversationTurn::user("Hello"),
            ConversationTurn {
                role: Role::Assistant,
                content: "Hi!".to_string(),
            },
        ];
        let messages = build_messages("Be brief.", &turns);
        let roles: Vec<&str> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
        assert_eq!(messages[0].content, "Be brief.");
    }
}
