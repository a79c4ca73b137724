//! Lead timers: deferred follow-up actions tied to a lead.
//!
//! A timer is *pending* iff neither `executed_at` nor `cancelled_at` is set.
//! Cancelled timers are kept, never deleted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::Payload;
use super::ids::{LeadId, LeadTimerId, TeamId};

/// Default retry budget for a timer whose executor keeps failing.
pub const DEFAULT_TIMER_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimerType {
    /// 7-day no-response check.
    #[serde(rename = "TIMER_7D")]
    Timer7d,
    /// 14-day escalation / template rotation.
    #[serde(rename = "TIMER_14D")]
    Timer14d,
    /// 30-day archive check.
    #[serde(rename = "TIMER_30D")]
    Timer30d,
    #[serde(rename = "FOLLOW_UP")]
    FollowUp,
    #[serde(rename = "CALLBACK")]
    Callback,
}

impl TimerType {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerType::Timer7d => "TIMER_7D",
            TimerType::Timer14d => "TIMER_14D",
            TimerType::Timer30d => "TIMER_30D",
            TimerType::FollowUp => "FOLLOW_UP",
            TimerType::Callback => "CALLBACK",
        }
    }
}

impl fmt::Display for TimerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A timer not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeadTimer {
    pub team_id: TeamId,
    pub lead_id: LeadId,
    pub timer_type: TimerType,
    pub trigger_at: DateTime<Utc>,
    /// Semantic label, e.g. `"retarget"`, `"escalate"`.
    pub action: String,
    pub action_payload: Payload,
    pub max_attempts: u32,
}

impl NewLeadTimer {
    pub fn into_timer(self, id: LeadTimerId, now: DateTime<Utc>) -> LeadTimer {
        LeadTimer {
            id,
            team_id: self.team_id,
            lead_id: self.lead_id,
            timer_type: self.timer_type,
            trigger_at: self.trigger_at,
            action: self.action,
            action_payload: self.action_payload,
            executed_at: None,
            cancelled_at: None,
            cancel_reason: None,
            attempts: 0,
            max_attempts: self.max_attempts,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadTimer {
    pub id: LeadTimerId,
    pub team_id: TeamId,
    pub lead_id: LeadId,
    pub timer_type: TimerType,
    pub trigger_at: DateTime<Utc>,
    pub action: String,
    #[serde(default)]
    pub action_payload: Payload,

    pub executed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,

    /// Executor runs so far (successful or not).
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeadTimer {
    pub fn is_pending(&self) -> bool {
        self.executed_at.is_none() && self.cancelled_at.is_none()
    }

    /// Pending and `trigger_at` has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.trigger_at <= now
    }

    /// Mark cancelled. No-op unless pending, so an earlier reason survives.
    pub fn cancel(&mut self, reason: &str, at: DateTime<Utc>) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.cancelled_at = Some(at);
        self.cancel_reason = Some(reason.to_string());
        self.updated_at = at;
        true
    }

    pub fn mark_executed(&mut self, at: DateTime<Utc>) {
        self.executed_at = Some(at);
        self.attempts += 1;
        self.last_error = None;
        self.updated_at = at;
    }

    pub fn record_failure(&mut self, error: String, at: DateTime<Utc>) {
        self.attempts += 1;
        self.last_error = Some(error);
        self.updated_at = at;
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}
