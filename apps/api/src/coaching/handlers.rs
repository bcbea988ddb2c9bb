//! Axum route handlers for the coaching API.
//!
//! Every handler validates its body, runs the access check, then hands a
//! prompt to the relay. Streaming handlers forward the relay's SSE frames
//! verbatim; `job-intel` waits for the full text.

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE},
        HeaderValue,
    },
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::access::caller::{Caller, USAGE_COUNT, USAGE_RESET_AT};
use crate::access::{check_access, AccessDecision, Account, Action, Grant, UsageUpdate};
use crate::coaching::prompts;
use crate::errors::AppError;
use crate::relay::{ConversationTurn, RelayRequest, RelayStream};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OptimizeResumeRequest {
    pub jd: Option<String>,
    pub resume: Option<String>,
    pub company: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InterviewQuestionsRequest {
    pub jd: Option<String>,
    pub resume: Option<String>,
    pub company: Option<String>,
    pub language: Option<String>,
}

/// Body shared by the two conversational endpoints (chat, mock interview).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    pub jd: Option<String>,
    pub resume: Option<String>,
    pub company: Option<String>,
    #[serde(default)]
    pub messages: Vec<ConversationTurn>,
    #[serde(alias = "user_message")]
    pub user_message: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JobIntelRequest {
    pub company: Option<String>,
    pub jd: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobIntelResponse {
    pub report: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/optimize-resume
pub async fn handle_optimize_resume(
    State(state): State<AppState>,
    Caller(account): Caller,
    Json(req): Json<OptimizeResumeRequest>,
) -> Result<Response, AppError> {
    let (Some(jd), Some(resume)) = (non_blank(&req.jd), non_blank(&req.resume)) else {
        return Err(AppError::Validation("JD and resume are required".to_string()));
    };
    let grant = authorize(Action::OptimizeResume, account.as_ref())?;

    let request = RelayRequest {
        system_prompt: prompts::optimize_resume_system(req.language.as_deref()),
        prior_turns: Vec::new(),
        user_message: prompts::optimize_resume_message(req.company.as_deref(), jd, resume),
        credential: grant.credential.clone(),
    };

    Ok(event_stream(state.relay.stream(request), &grant))
}

/// POST /api/interview-questions
pub async fn handle_interview_questions(
    State(state): State<AppState>,
    Caller(account): Caller,
    Json(req): Json<InterviewQuestionsRequest>,
) -> Result<Response, AppError> {
    let Some(jd) = non_blank(&req.jd) else {
        return Err(AppError::Validation("JD is required".to_string()));
    };
    let grant = authorize(Action::InterviewQuestions, account.as_ref())?;

    let request = RelayRequest {
        system_prompt: prompts::interview_questions_system(req.language.as_deref()),
        prior_turns: Vec::new(),
        user_message: prompts::interview_questions_message(
            req.company.as_deref(),
            jd,
            req.resume.as_deref(),
        ),
        credential: grant.credential.clone(),
    };

    Ok(event_stream(state.relay.stream(request), &grant))
}

/// POST /api/mock-interview
pub async fn handle_mock_interview(
    State(state): State<AppState>,
    Caller(account): Caller,
    Json(req): Json<ConversationRequest>,
) -> Result<Response, AppError> {
    let user_message = required_user_message(&req)?;
    let grant = authorize(Action::MockInterview, account.as_ref())?;

    let system_prompt = prompts::mock_interview_system(
        req.company.as_deref(),
        req.jd.as_deref(),
        req.resume.as_deref(),
        req.language.as_deref(),
    );
    let request = RelayRequest {
        system_prompt,
        prior_turns: req.messages,
        user_message,
        credential: grant.credential.clone(),
    };

    Ok(event_stream(state.relay.stream(request), &grant))
}

/// POST /api/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Caller(account): Caller,
    Json(req): Json<ConversationRequest>,
) -> Result<Response, AppError> {
    let user_message = required_user_message(&req)?;
    let grant = authorize(Action::Chat, account.as_ref())?;

    let system_prompt = prompts::chat_system(
        req.company.as_deref(),
        req.jd.as_deref(),
        req.resume.as_deref(),
        req.language.as_deref(),
    );
    let request = RelayRequest {
        system_prompt,
        prior_turns: req.messages,
        user_message,
        credential: grant.credential.clone(),
    };

    Ok(event_stream(state.relay.stream(request), &grant))
}

/// POST /api/job-intel
pub async fn handle_job_intel(
    State(state): State<AppState>,
    Caller(account): Caller,
    Json(req): Json<JobIntelRequest>,
) -> Result<Response, AppError> {
    let Some(company) = non_blank(&req.company) else {
        return Err(AppError::Validation("Company name is required".to_string()));
    };
    let grant = authorize(Action::JobIntel, account.as_ref())?;

    let request = RelayRequest {
        system_prompt: prompts::job_intel_system(req.language.as_deref()),
        prior_turns: Vec::new(),
        user_message: prompts::job_intel_message(company, req.jd.as_deref()),
        credential: grant.credential.clone(),
    };
    let report = state.relay.complete(request).await?;

    let mut response = Json(JobIntelResponse { report }).into_response();
    attach_usage(&mut response, grant.usage.as_ref());
    Ok(response)
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn required_user_message(req: &ConversationRequest) -> Result<String, AppError> {
    non_blank(&req.user_message)
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("userMessage is required".to_string()))
}

fn authorize(action: Action, account: Option<&Account>) -> Result<Grant, AppError> {
    match check_access(action, account, Utc::now()) {
        AccessDecision::Allowed(grant) => {
            info!(
                user_id = %grant.user_id,
                action = %action,
                own_key = grant.credential.is_some(),
                usage_count = grant.usage.map(|u| u.usage_count),
                "Access granted"
            );
            Ok(grant)
        }
        AccessDecision::Denied(reason) => {
            info!(action = %action, reason = reason.as_str(), "Access denied");
            Err(AppError::AccessDenied(reason))
        }
    }
}

/// `text/event-stream` response whose body is the relay's frames, unchanged.
fn event_stream(stream: RelayStream, grant: &Grant) -> Response {
    let mut response = (
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (CONNECTION, "keep-alive"),
        ],
        Body::from_stream(stream.into_sse()),
    )
        .into_response();
    attach_usage(&mut response, grant.usage.as_ref());
    response
}

/// Echoes a consumed quota back so the gateway can persist it.
fn attach_usage(response: &mut Response, usage: Option<&UsageUpdate>) {
    let Some(usage) = usage else {
        return;
    };
    let headers = response.headers_mut();
    headers.insert(USAGE_COUNT, HeaderValue::from(usage.usage_count));
    let reset_at = usage
        .usage_reset_at
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    if let Ok(value) = HeaderValue::from_str(&reset_at) {
        headers.insert(USAGE_RESET_AT, value);
    }
}
