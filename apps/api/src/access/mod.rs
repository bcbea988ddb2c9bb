//! Plan and usage gating, consulted once per request before the relay runs.
//!
//! `check_access` is a pure decision table. It never persists anything: when a
//! free-plan call consumes quota, the new counter comes back in the grant and
//! the caller is responsible for storing it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};

use crate::relay::ProviderCredential;

pub mod caller;

/// Monthly `optimize-resume` calls allowed on the free plan.
pub const FREE_MONTHLY_LIMIT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    OptimizeResume,
    InterviewQuestions,
    MockInterview,
    Chat,
    JobIntel,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::OptimizeResume => "optimize-resume",
            Action::InterviewQuestions => "interview-questions",
            Action::MockInterview => "mock-interview",
            Action::Chat => "chat",
            Action::JobIntel => "job-intel",
        }
    }

    fn requires_pro(self) -> bool {
        matches!(
            self,
            Action::JobIntel | Action::InterviewQuestions | Action::MockInterview | Action::Chat
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            other => Err(format!("unknown plan '{other}'")),
        }
    }
}

/// What the gateway knows about the signed-in user.
#[derive(Debug, Clone)]
pub struct Account {
    pub user_id: String,
    pub plan: Plan,
    pub usage_count: u32,
    pub usage_reset_at: DateTime<Utc>,
    /// Bring-your-own-key credential. Present means limits do not apply.
    pub credential: Option<ProviderCredential>,
}

/// New usage counter to persist after a metered call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageUpdate {
    pub usage_count: u32,
    pub usage_reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub user_id: String,
    /// `None` means the relay's default credential.
    pub credential: Option<ProviderCredential>,
    pub usage: Option<UsageUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    ProRequired,
    LimitReached,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "unauthenticated",
            DenyReason::ProRequired => "pro_required",
            DenyReason::LimitReached => "limit_reached",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed(Grant),
    Denied(DenyReason),
}

/// Evaluated top to bottom; the first matching row wins:
///
/// | account         | plan | action            | result                          |
/// |-----------------|------|-------------------|---------------------------------|
/// | none            |      |                   | denied: unauthenticated         |
/// | has own key     |      |                   | allowed with that key           |
/// |                 | pro  |                   | allowed                         |
/// |                 | free | pro-only          | denied: pro required            |
/// |                 | free | optimize-resume   | metered against the month quota |
/// |                 | free | anything else     | allowed                         |
pub fn check_access(action: Action, account: Option<&Account>, now: DateTime<Utc>) -> AccessDecision {
    let Some(account) = account else {
        return AccessDecision::Denied(DenyReason::Unauthenticated);
    };

    if let Some(credential) = &account.credential {
        return allowed(account, Some(credential.clone()), None);
    }

    if account.plan == Plan::Pro {
        return allowed(account, None, None);
    }

    if action.requires_pro() {
        return AccessDecision::Denied(DenyReason::ProRequired);
    }

    if action == Action::OptimizeResume {
        let reset_at = account.usage_reset_at;
        let new_month = now.year() != reset_at.year() || now.month() != reset_at.month();

        if new_month {
            let usage = UsageUpdate {
                usage_count: 1,
                usage_reset_at: now,
            };
            return allowed(account, None, Some(usage));
        }

        if account.usage_count >= FREE_MONTHLY_LIMIT {
            return AccessDecision::Denied(DenyReason::LimitReached);
        }

        let usage = UsageUpdate {
            usage_count: account.usage_count + 1,
            usage_reset_at: reset_at,
        };
        return allowed(account, None, Some(usage));
    }

    allowed(account, None, None)
}

fn allowed(
    account: &Account,
    credential: Option<ProviderCredential>,
    usage: Option<UsageUpdate>,
) -> AccessDecision {
    AccessDecision::Allowed(Grant {
        user_id: account.user_id.clone(),
        credential,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::Provider;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn free_account(usage_count: u32, usage_reset_at: DateTime<Utc>) -> Account {
        Account {
            user_id: "user-1".to_string(),
            plan: Plan::Free,
            usage_count,
            usage_reset_at,
            credential: None,
        }
    }

    fn grant(decision: AccessDecision) -> Grant {
        match decision {
            AccessDecision::Allowed(grant) => grant,
            AccessDecision::Denied(reason) => panic!("expected allowed, got {reason:?}"),
        }
    }

    #[test]
    fn test_missing_account_is_unauthenticated() {
        let decision = check_access(Action::OptimizeResume, None, at(2025, 3, 1));
        assert_eq!(decision, AccessDecision::Denied(DenyReason::Unauthenticated));
    }

    #[test]
    fn test_byok_bypasses_plan_and_limits() {
        let mut account = free_account(99, at(2025, 3, 1));
        account.credential = Some(ProviderCredential {
            provider: Provider::Gemini,
            api_key: "g-key".to_string(),
            model: None,
        });

        for action in [Action::Chat, Action::OptimizeResume, Action::JobIntel] {
            let g = grant(check_access(action, Some(&account), at(2025, 3, 2)));
            assert_eq!(g.credential, account.credential);
            assert_eq!(g.usage, None);
        }
    }

    #[test]
    fn test_pro_plan_uses_default_credential() {
        let mut account = free_account(50, at(2025, 3, 1));
        account.plan = Plan::Pro;
        let g = grant(check_access(Action::MockInterview, Some(&account), at(2025, 3, 2)));
        assert_eq!(g.credential, None);
        assert_eq!(g.usage, None);
    }

    #[test]
    fn test_free_plan_blocked_from_pro_actions() {
        let account = free_account(0, at(2025, 3, 1));
        for action in [
            Action::JobIntel,
            Action::InterviewQuestions,
            Action::MockInterview,
            Action::Chat,
        ] {
            assert_eq!(
                check_access(action, Some(&account), at(2025, 3, 2)),
                AccessDecision::Denied(DenyReason::ProRequired),
                "{action} should be pro-only"
            );
        }
    }

    #[test]
    fn test_free_optimize_increments_within_month() {
        let reset = at(2025, 3, 1);
        let g = grant(check_access(
            Action::OptimizeResume,
            Some(&free_account(2, reset)),
            at(2025, 3, 20),
        ));
        assert_eq!(
            g.usage,
            Some(UsageUpdate {
                usage_count: 3,
                usage_reset_at: reset
            })
        );
    }

    #[test]
    fn test_free_optimize_limit_reached() {
        let decision = check_access(
            Action::OptimizeResume,
            Some(&free_account(FREE_MONTHLY_LIMIT, at(2025, 3, 1))),
            at(2025, 3, 31),
        );
        assert_eq!(decision, AccessDecision::Denied(DenyReason::LimitReached));
    }

    #[test]
    fn test_new_month_resets_counter() {
        let now = at(2025, 4, 1);
        let g = grant(check_access(
            Action::OptimizeResume,
            Some(&free_account(FREE_MONTHLY_LIMIT, at(2025, 3, 15))),
            now,
        ));
        assert_eq!(
            g.usage,
            Some(UsageUpdate {
                usage_count: 1,
                usage_reset_at: now
            })
        );
    }

    #[test]
    fn test_same_month_different_year_resets_counter() {
        let now = at(2026, 3, 10);
        let g = grant(check_access(
            Action::OptimizeResume,
            Some(&free_account(FREE_MONTHLY_LIMIT, at(2025, 3, 10))),
            now,
        ));
        assert_eq!(g.usage.map(|u| u.usage_count), Some(1));
    }

    #[test]
    fn test_plan_from_str() {
        assert_eq!("PRO".parse::<Plan>(), Ok(Plan::Pro));
        assert_eq!("free".parse::<Plan>(), Ok(Plan::Free));
        assert!("enterprise".parse::<Plan>().is_err());
    }
}
