//! Events - 監査ログとドメイン通知
//!
//! - **LeadEvent**: 追記専用（append-only）の監査レコード。更新・削除しない。
//!   `lead_state` カラムとは独立に、このログだけからリードの履歴を再構築できる。
//! - **LeadUpdated**: 遷移コミット後に EventSink へ流す通知（fire-and-forget）。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::{LeadEventId, LeadId, TeamId};
use super::state::LeadState;

/// Free-form payload attached to an event (`triggeredBy`, timer reason, ...).
pub type Payload = Map<String, Value>;

/// Event tag stored in `event_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadEventType {
    /// Default tag for a state transition.
    StateChanged,

    SmsSent,
    EmailSent,
    CallOutbound,

    SmsReceived,
    EmailReceived,
    CallInbound,

    EmailCaptured,
    MeetingRequested,
    HighIntentDetected,

    #[serde(rename = "TIMER_7D")]
    Timer7d,
    #[serde(rename = "TIMER_14D")]
    Timer14d,

    OptOut,
    DealClosed,
    Archived,
}

impl LeadEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadEventType::StateChanged => "STATE_CHANGED",
            LeadEventType::SmsSent => "SMS_SENT",
            LeadEventType::EmailSent => "EMAIL_SENT",
            LeadEventType::CallOutbound => "CALL_OUTBOUND",
            LeadEventType::SmsReceived => "SMS_RECEIVED",
            LeadEventType::EmailReceived => "EMAIL_RECEIVED",
            LeadEventType::CallInbound => "CALL_INBOUND",
            LeadEventType::EmailCaptured => "EMAIL_CAPTURED",
            LeadEventType::MeetingRequested => "MEETING_REQUESTED",
            LeadEventType::HighIntentDetected => "HIGH_INTENT_DETECTED",
            LeadEventType::Timer7d => "TIMER_7D",
            LeadEventType::Timer14d => "TIMER_14D",
            LeadEventType::OptOut => "OPT_OUT",
            LeadEventType::DealClosed => "DEAL_CLOSED",
            LeadEventType::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for LeadEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Who caused an event: `system`, `timer`, or a caller-supplied label
/// (worker name, user id, webhook provider).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventSource {
    #[default]
    System,
    Timer,
    Other(String),
}

impl EventSource {
    pub fn as_str(&self) -> &str {
        match self {
            EventSource::System => "system",
            EventSource::Timer => "timer",
            EventSource::Other(label) => label,
        }
    }
}

impl From<String> for EventSource {
    fn from(value: String) -> Self {
        match value.as_str() {
            "system" => EventSource::System,
            "timer" => EventSource::Timer,
            _ => EventSource::Other(value),
        }
    }
}

impl From<&str> for EventSource {
    fn from(value: &str) -> Self {
        EventSource::from(value.to_string())
    }
}

impl From<EventSource> for String {
    fn from(value: EventSource) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// An event not yet written. The store assigns nothing; id and
/// `processed_at` are stamped by the caller through [`NewLeadEvent::into_event`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeadEvent {
    pub tenant_id: String,
    pub team_id: TeamId,
    pub lead_id: LeadId,
    pub event_type: LeadEventType,
    pub event_source: EventSource,
    pub previous_state: Option<LeadState>,
    pub new_state: Option<LeadState>,
    pub payload: Payload,
}

impl NewLeadEvent {
    pub fn into_event(self, id: LeadEventId, processed_at: DateTime<Utc>) -> LeadEvent {
        LeadEvent {
            id,
            tenant_id: self.tenant_id,
            team_id: self.team_id,
            lead_id: self.lead_id,
            event_type: self.event_type,
            event_source: self.event_source,
            previous_state: self.previous_state,
            new_state: self.new_state,
            payload: self.payload,
            processed_at,
        }
    }
}

/// Immutable audit record. Written exactly once per transition or per
/// timer-fired action; never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadEvent {
    pub id: LeadEventId,
    pub tenant_id: String,
    pub team_id: TeamId,
    pub lead_id: LeadId,
    pub event_type: LeadEventType,
    pub event_source: EventSource,
    pub previous_state: Option<LeadState>,
    pub new_state: Option<LeadState>,
    #[serde(default)]
    pub payload: Payload,
    pub processed_at: DateTime<Utc>,
}

impl LeadEvent {
    /// Does this event move the lead (as opposed to an informational entry)?
    pub fn is_transition(&self) -> bool {
        self.new_state.is_some()
    }

    pub fn triggered_by(&self) -> Option<&str> {
        self.payload.get("triggeredBy").and_then(Value::as_str)
    }
}

/// "lead updated" notification published after a transition commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpdated {
    pub lead_id: LeadId,
    pub team_id: TeamId,
    pub event_id: LeadEventId,
    pub previous_state: LeadState,
    pub new_state: LeadState,
    pub occurred_at: DateTime<Utc>,
}
