//! Domain model (IDs, states, transition table, leads, events, timers, errors).
//!
//! I/O を持たない純粋な型と関数のみ。永続化は ports、組み立ては app。

pub mod errors;
pub mod events;
pub mod ids;
pub mod lead;
pub mod state;
pub mod timer;
pub mod transitions;

pub use self::errors::{ErrorKind, LeadError, StoreError};
pub use self::events::{
    EventSource, LeadEvent, LeadEventType, LeadUpdated, NewLeadEvent, Payload,
};
pub use self::ids::{Id, IdMarker, IdParseError, LeadEventId, LeadId, LeadTimerId, TeamId};
pub use self::lead::Lead;
pub use self::state::{LeadState, UnknownLeadState};
pub use self::timer::{DEFAULT_TIMER_MAX_ATTEMPTS, LeadTimer, NewLeadTimer, TimerType};
pub use self::transitions::{
    allowed_next_states, describe_allowed, is_valid_transition, valid_transitions,
};
