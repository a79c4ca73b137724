//! Transition table: the only source of truth for "is X -> Y legal".
//!
//! The table is a `match` over `'static` slices, so it is built by the
//! compiler, immutable, and free to read from any thread. There is no
//! registry object and no runtime mutation.

use super::state::LeadState;

use LeadState::*;

/// Allowed next states from `current`, in display order.
///
/// Terminal states return an empty slice. No state lists itself, so
/// self-transitions are never legal.
pub fn allowed_next_states(current: LeadState) -> &'static [LeadState] {
    match current {
        New => &[Touched, Suppressed],
        Touched => &[Retargeting, Responded, Closed, Suppressed],
        Retargeting => &[Responded, ContentNurture, Closed, Suppressed],
        Responded => &[
            SoftInterest,
            EmailCaptured,
            ContentNurture,
            HighIntent,
            AppointmentBooked,
            InCallQueue,
            Closed,
            Suppressed,
        ],
        SoftInterest => &[EmailCaptured, ContentNurture, HighIntent, Closed, Suppressed],
        EmailCaptured => &[
            ContentNurture,
            HighIntent,
            AppointmentBooked,
            InCallQueue,
            Closed,
            Suppressed,
        ],
        ContentNurture => &[Responded, HighIntent, AppointmentBooked, Closed, Suppressed],
        HighIntent => &[AppointmentBooked, InCallQueue, Closed, Suppressed],
        AppointmentBooked => &[InCallQueue, Closed, Suppressed],
        InCallQueue => &[AppointmentBooked, Closed, Suppressed],
        Closed | Suppressed => &[],
    }
}

/// `to ∈ allowed_next_states(from)`.
pub fn is_valid_transition(from: LeadState, to: LeadState) -> bool {
    allowed_next_states(from).contains(&to)
}

/// Owned copy of the allowed set, for callers that hand it across an API.
pub fn valid_transitions(current: LeadState) -> Vec<LeadState> {
    allowed_next_states(current).to_vec()
}

/// Human-readable allowed set used in rejection messages:
/// `"retargeting, responded, closed, suppressed"` or `"none (terminal state)"`.
pub fn describe_allowed(allowed: &[LeadState]) -> String {
    if allowed.is_empty() {
        return "none (terminal state)".to_string();
    }
    allowed
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
