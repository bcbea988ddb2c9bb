use anyhow::{Context, Result};

use crate::relay::{DefaultCredential, Endpoints};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub default_credential: DefaultCredential,
    pub endpoints: Endpoints,
    pub llm_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            default_credential: DefaultCredential::new(require_env("ANTHROPIC_API_KEY")?),
            endpoints: endpoints_from(|key| std::env::var(key).ok()),
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse::<u64>()
                .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Vendor base URLs, each overridable with `<VENDOR>_BASE_URL`.
fn endpoints_from(lookup: impl Fn(&str) -> Option<String>) -> Endpoints {
    let defaults = Endpoints::default();
    let pick = |key: &str, default: String| {
        lookup(key)
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(default)
    };

    Endpoints {
        anthropic: pick("ANTHROPIC_BASE_URL", defaults.anthropic),
        openai: pick("OPENAI_BASE_URL", defaults.openai),
        deepseek: pick("DEEPSEEK_BASE_URL", defaults.deepseek),
        gemini: pick("GEMINI_BASE_URL", defaults.gemini),
    }
}
