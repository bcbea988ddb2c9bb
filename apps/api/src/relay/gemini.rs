//! Gemini `streamGenerateContent` with `alt=sse`.
//!
//! Gemini calls the assistant side `model` and takes the system prompt as a
//! separate `system_instruction` block rather than a message.

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::sse::{data_lines, ensure_success, upstream_events};
use super::{ChatBackend, ConversationTurn, Dispatch, RelayError, Role, TextStream, MAX_TOKENS};

const VENDOR: &str = "Gemini";

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentChunk {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .filter(|text| !text.is_empty())
    }
}

fn build_request<'a>(system_prompt: &'a str, turns: &'a [ConversationTurn]) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: [Part {
                text: system_prompt,
            }],
        },
        contents: turns
            .iter()
            .map(|turn| Content {
                role: Some(match turn.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                }),
                parts: [Part {
                    text: &turn.content,
                }],
            })
            .collect(),
        generation_config: GenerationConfig {
            max_output_tokens: MAX_TOKENS,
        },
    }
}

pub(super) struct GeminiBackend;

#[async_trait::async_trait]
impl ChatBackend for GeminiBackend {
    async fn open(
        &self,
        http: &Client,
        dispatch: &Dispatch,
        system_prompt: &str,
        turns: &[ConversationTurn],
    ) -> Result<TextStream, RelayError> {
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent",
            dispatch.base_url, dispatch.model
        );

        let response = http
            .post(url)
            .header("x-goog-api-key", &dispatch.api_key)
            .query(&[("alt", "sse")])
            .json(&build_request(system_prompt, turns))
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
                    match serde_json::from_str::<GenerateContentChunk>(data) {
                        Ok(chunk) => {
                            if let Some(text) = chunk.into_text() {
                                yield Ok(text);
                            }
                        }
                        Err(err) => trace!("Skipping unparsable {VENDOR} line: {err}"),
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
