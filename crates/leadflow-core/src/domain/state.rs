//! Canonical lead lifecycle states.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of lifecycle stages a lead can occupy.
///
/// Serialized as snake_case (`"soft_interest"`), which is also the form stored
/// in the lead row's `lead_state` column. A missing column value means
/// [`LeadState::New`]; see [`LeadState::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadState {
    /// Imported, never contacted.
    New,
    /// At least one outbound message sent.
    Touched,
    /// No reply within the first follow-up window.
    Retargeting,
    /// Any inbound reply.
    Responded,
    SoftInterest,
    EmailCaptured,
    ContentNurture,
    HighIntent,
    AppointmentBooked,
    /// Escalated for a human call.
    InCallQueue,
    /// Deal won or lost. Terminal.
    Closed,
    /// Opt-out / do-not-contact. Terminal.
    Suppressed,
}

impl LeadState {
    /// Every state, in lifecycle order.
    pub const ALL: [LeadState; 12] = [
        LeadState::New,
        LeadState::Touched,
        LeadState::Retargeting,
        LeadState::Responded,
        LeadState::SoftInterest,
        LeadState::EmailCaptured,
        LeadState::ContentNurture,
        LeadState::HighIntent,
        LeadState::AppointmentBooked,
        LeadState::InCallQueue,
        LeadState::Closed,
        LeadState::Suppressed,
    ];

    /// The absence of a stored state means `new`.
    pub fn normalize(stored: Option<LeadState>) -> LeadState {
        stored.unwrap_or(LeadState::New)
    }

    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, LeadState::Closed | LeadState::Suppressed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeadState::New => "new",
            LeadState::Touched => "touched",
            LeadState::Retargeting => "retargeting",
            LeadState::Responded => "responded",
            LeadState::SoftInterest => "soft_interest",
            LeadState::EmailCaptured => "email_captured",
            LeadState::ContentNurture => "content_nurture",
            LeadState::HighIntent => "high_intent",
            LeadState::AppointmentBooked => "appointment_booked",
            LeadState::InCallQueue => "in_call_queue",
            LeadState::Closed => "closed",
            LeadState::Suppressed => "suppressed",
        }
    }
}

impl fmt::Display for LeadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Returned when a string is not one of the canonical state names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lead state '{0}'")]
pub struct UnknownLeadState(pub String);

impl FromStr for LeadState {
    type Err = UnknownLeadState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownLeadState(s.to_string()))
    }
}
