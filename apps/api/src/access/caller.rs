//! Caller identity as forwarded by the authenticating gateway.
//!
//! Sign-in happens upstream of this service. The gateway strips any
//! client-supplied copies of these headers and sets its own:
//!
//! - `x-user-id`: absent means anonymous
//! - `x-user-plan`: `free` (default) or `pro`
//! - `x-usage-count`, `x-usage-reset-at` (RFC 3339): current metering state
//! - `x-ai-provider`, `x-ai-api-key`, `x-ai-model`: the user's own key, if any

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{Account, Plan};
use crate::errors::AppError;
use crate::relay::{Provider, ProviderCredential};

pub const USER_ID: &str = "x-user-id";
pub const USER_PLAN: &str = "x-user-plan";
pub const USAGE_COUNT: &str = "x-usage-count";
pub const USAGE_RESET_AT: &str = "x-usage-reset-at";
pub const AI_PROVIDER: &str = "x-ai-provider";
pub const AI_API_KEY: &str = "x-ai-api-key";
pub const AI_MODEL: &str = "x-ai-model";

#[derive(Debug, Error)]
#[error("Invalid header '{name}': {reason}")]
pub struct CallerError {
    pub name: &'static str,
    pub reason: String,
}

impl From<CallerError> for AppError {
    fn from(err: CallerError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Extracts the (optional) signed-in account from gateway headers.
pub struct Caller(pub Option<Account>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller(account_from_headers(&parts.headers, Utc::now())?))
    }
}

/// Builds the account from headers. A missing reset timestamp means the
/// counter belongs to the current period (`now`).
pub fn account_from_headers(
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<Option<Account>, CallerError> {
    let Some(user_id) = header_str(headers, USER_ID)? else {
        return Ok(None);
    };

    let plan = match header_str(headers, USER_PLAN)? {
        Some(raw) => raw.parse::<Plan>().map_err(|reason| CallerError {
            name: USER_PLAN,
            reason,
        })?,
        None => Plan::default(),
    };

    let usage_count = match header_str(headers, USAGE_COUNT)? {
        Some(raw) => raw.parse::<u32>().map_err(|e| CallerError {
            name: USAGE_COUNT,
            reason: e.to_string(),
        })?,
        None => 0,
    };

    let usage_reset_at = match header_str(headers, USAGE_RESET_AT)? {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map_err(|e| CallerError {
                name: USAGE_RESET_AT,
                reason: e.to_string(),
            })?
            .with_timezone(&Utc),
        None => now,
    };

    Ok(Some(Account {
        user_id: user_id.to_string(),
        plan,
        usage_count,
        usage_reset_at,
        credential: credential_from_headers(headers)?,
    }))
}

/// Both provider and key must be present; either alone is ignored.
fn credential_from_headers(headers: &HeaderMap) -> Result<Option<ProviderCredential>, CallerError> {
    let (Some(provider), Some(api_key)) = (
        header_str(headers, AI_PROVIDER)?,
        header_str(headers, AI_API_KEY)?,
    ) else {
        return Ok(None);
    };

    let provider = provider.parse::<Provider>().map_err(|e| CallerError {
        name: AI_PROVIDER,
        reason: e.to_string(),
    })?;

    Ok(Some(ProviderCredential {
        provider,
        api_key: api_key.to_string(),
        model: header_str(headers, AI_MODEL)?.map(str::to_string),
    }))
}

/// Trimmed header value; empty counts as absent.
fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<Option<&'a str>, CallerError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| CallerError {
        name,
        reason: "not valid ASCII".to_string(),
    })?;
    let value = value.trim();
    Ok((!value.is_empty()).then_some(value))
}
