//! Stream relay: the single point of entry for every upstream model call.
//!
//! A caller hands over a system prompt, prior turns and the new user message.
//! The relay picks exactly one vendor (the caller's own credential, or the
//! process-wide default Anthropic key), opens that vendor's streaming endpoint
//! and re-frames whatever the vendor speaks into one SSE convention:
//!
//! ```text
//! data: {"text":"<fragment>"}\n\n     one per incremental fragment
//! data: [DONE]\n\n                    success, always last
//! data: {"error":"<message>"}\n\n     failure, always last
//! ```
//!
//! Fragments are incremental, never cumulative: concatenating every `text`
//! payload in order yields the full answer.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

mod anthropic;
mod gemini;
mod openai_compat;
mod sse;
mod stream;

pub use stream::RelayStream;

use anthropic::AnthropicBackend;
use gemini::GeminiBackend;
use openai_compat::OpenAiCompatibleBackend;

/// Output budget sent to every vendor.
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("{vendor} API error {status}: {body}")]
    Api {
        vendor: &'static str,
        status: u16,
        body: String,
    },

    #[error("{vendor} stream error: {message}")]
    Upstream {
        vendor: &'static str,
        message: String,
    },

    #[error("Stream read error: {0}")]
    Read(String),
}

// Request URLs can carry credentials, so they never reach an error message.
impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Http(err.without_url())
    }
}

#[derive(Debug, Error)]
#[error("Unknown provider '{0}' (expected one of: anthropic, openai, gemini, deepseek)")]
pub struct UnknownProvider(pub String);

// ────────────────────────────────────────────────────────────────────────────
// Conversation + credential types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAi,
    DeepSeek,
    Gemini,
}

impl Provider {
    /// Model used when a credential names this provider without a model.
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-sonnet-4-6",
            Provider::OpenAi => "gpt-4o",
            Provider::DeepSeek => "deepseek-chat",
            Provider::Gemini => "gemini-1.5-flash",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
            Provider::DeepSeek => "deepseek",
            Provider::Gemini => "gemini",
        }
    }

    /// Human-facing vendor name used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Provider::Anthropic => "Anthropic",
            Provider::OpenAi => "OpenAI",
            Provider::DeepSeek => "DeepSeek",
            Provider::Gemini => "Gemini",
        }
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAi),
            "deepseek" => Ok(Provider::DeepSeek),
            "gemini" => Ok(Provider::Gemini),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller-supplied key. Replaces the default credential wholesale.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredential {
    pub provider: Provider,
    pub api_key: String,
    pub model: Option<String>,
}

impl fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredential")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

/// The process-wide Anthropic key. Loaded once at startup, never mutated.
#[derive(Clone)]
pub struct DefaultCredential(String);

impl DefaultCredential {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self(api_key.into())
    }
}

impl fmt::Debug for DefaultCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultCredential(<redacted>)")
    }
}

/// Vendor base URLs. Overridable so a fake vendor can stand in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub anthropic: String,
    pub openai: String,
    pub deepseek: String,
    pub gemini: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            anthropic: "https://api.anthropic.com".to_string(),
            openai: "https://api.openai.com/v1".to_string(),
            deepseek: "https://api.deepseek.com/v1".to_string(),
            gemini: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

impl Endpoints {
    pub fn base_url(&self, provider: Provider) -> &str {
        match provider {
            Provider::Anthropic => &self.anthropic,
            Provider::OpenAi => &self.openai,
            Provider::DeepSeek => &self.deepseek,
            Provider::Gemini => &self.gemini,
        }
    }
}

/// One relay invocation's input.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub system_prompt: String,
    pub prior_turns: Vec<ConversationTurn>,
    pub user_message: String,
    pub credential: Option<ProviderCredential>,
}

/// Output event of one invocation. `Done` and `Error` are terminal.
#[derive(Debug)]
pub enum RelayEvent {
    Text(String),
    Done,
    Error(RelayError),
}

impl RelayEvent {
    /// Renders the event in the relay's SSE framing.
    pub fn to_sse(&self) -> Bytes {
        let payload = match self {
            RelayEvent::Text(text) => json!({ "text": text }).to_string(),
            RelayEvent::Done => "[DONE]".to_string(),
            RelayEvent::Error(err) => json!({ "error": err.to_string() }).to_string(),
        };
        Bytes::from(format!("data: {payload}\n\n"))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Vendor dispatch
// ────────────────────────────────────────────────────────────────────────────

/// Fully resolved target of one invocation: who, with which key and model.
#[derive(Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Incremental text fragments from an open vendor connection.
pub(crate) type TextStream = BoxStream<'static, Result<String, RelayError>>;

/// One implementation per vendor wire protocol.
///
/// `open` issues the request and checks the status; the returned stream
/// yields the vendor's text deltas in arrival order, skipping payloads it
/// cannot parse.
#[async_trait::async_trait]
pub(crate) trait ChatBackend: Send + Sync {
    async fn open(
        &self,
        http: &Client,
        dispatch: &Dispatch,
        system_prompt: &str,
        turns: &[ConversationTurn],
    ) -> Result<TextStream, RelayError>;
}

fn backend_for(provider: Provider) -> &'static dyn ChatBackend {
    match provider {
        Provider::Anthropic => &AnthropicBackend,
        Provider::OpenAi | Provider::DeepSeek => &OpenAiCompatibleBackend,
        Provider::Gemini => &GeminiBackend,
    }
}

/// The relay. Cheap to clone; holds no per-invocation state.
#[derive(Clone)]
pub struct Relay {
    http: Client,
    default_credential: DefaultCredential,
    endpoints: Endpoints,
}

impl Relay {
    pub fn new(http: Client, default_credential: DefaultCredential, endpoints: Endpoints) -> Self {
        Self {
            http,
            default_credential,
            endpoints,
        }
    }

    /// Picks the vendor, key and model for one invocation.
    /// Never mixes a caller credential with the default one.
    pub fn resolve(&self, credential: Option<&ProviderCredential>) -> Dispatch {
        match credential {
            None => Dispatch {
                provider: Provider::Anthropic,
                api_key: self.default_credential.0.clone(),
                model: Provider::Anthropic.default_model().to_string(),
                base_url: self.endpoints.anthropic.clone(),
            },
            Some(cred) => Dispatch {
                provider: cred.provider,
                api_key: cred.api_key.clone(),
                model: cred
                    .model
                    .clone()
                    .unwrap_or_else(|| cred.provider.default_model().to_string()),
                base_url: self.endpoints.base_url(cred.provider).to_string(),
            },
        }
    }

    /// Starts an invocation. Nothing is sent until the stream is first polled.
    pub fn stream(&self, request: RelayRequest) -> RelayStream {
        let dispatch = self.resolve(request.credential.as_ref());
        let RelayRequest {
            system_prompt,
            mut prior_turns,
            user_message,
            ..
        } = request;
        prior_turns.push(ConversationTurn::user(user_message));

        debug!(
            provider = %dispatch.provider,
            model = %dispatch.model,
            turns = prior_turns.len(),
            "Relay invocation created"
        );

        let http = self.http.clone();
        let provider = dispatch.provider;
        let opening = Box::pin(async move {
            backend_for(dispatch.provider)
                .open(&http, &dispatch, &system_prompt, &prior_turns)
                .await
        });

        RelayStream::new(provider, opening)
    }

    /// Non-streaming variant: drains `stream` and returns the assembled text.
    pub async fn complete(&self, request: RelayRequest) -> Result<String, RelayError> {
        use futures::StreamExt;

        let mut stream = self.stream(request);
        let mut text = String::new();
        while let Some(event) = stream.next().await {
            match event {
                RelayEvent::Text(fragment) => text.push_str(&fragment),
                RelayEvent::Done => break,
                RelayEvent::Error(err) => return Err(err),
            }
        }
        Ok(text)
    }
}
