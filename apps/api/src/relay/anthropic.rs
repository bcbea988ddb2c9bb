//! Anthropic Messages API, streaming mode.
//!
//! The vendor emits typed events (`message_start`, `content_block_delta`,
//! `ping`, `message_stop`, ...). Only text deltas carry answer text; an
//! `error` event aborts the stream with the vendor's message.

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::sse::{data_lines, ensure_success, upstream_events};
use super::{ChatBackend, ConversationTurn, Dispatch, RelayError, TextStream, MAX_TOKENS};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const VENDOR: &str = "Anthropic";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [ConversationTurn],
    stream: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: Delta },
    Error { error: ErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub(super) struct AnthropicBackend;

#[async_trait::async_trait]
impl ChatBackend for AnthropicBackend {
    async fn open(
        &self,
        http: &Client,
        dispatch: &Dispatch,
        system_prompt: &str,
        turns: &[ConversationTurn],
    ) -> Result<TextStream, RelayError> {
        let body = MessagesRequest {
            model: &dispatch.model,
            max_tokens: MAX_TOKENS,
            system: system_prompt,
            messages: turns,
            stream: true,
        };

        let response = http
            .post(format!("{}/v1/messages", dispatch.base_url))
            .header("x-api-key", &dispatch.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response, VENDOR).await?;

        let mut events = upstream_events(response);
        let stream = async_stream::stream! {
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                };
                for data in data_lines(&event) {
                    match serde_json::from_str::<StreamEvent>(data) {
                        Ok(StreamEvent::ContentBlockDelta {
                            delta: Delta::TextDelta { text },
                        }) if !text.is_empty() => {
                            yield Ok(text);
                        }
                        Ok(StreamEvent::Error { error }) => {
                            yield Err(RelayError::Upstream {
                                vendor: VENDOR,
                                message: error.message,
                            });
                            return;
                        }
                        Ok(_) => {}
                        Err(err) => trace!("Skipping unparsable {VENDOR} line: {err}"),
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
