//! Lead record as seen by the state machine.
//!
//! The lead row belongs to the lead store; this core only reads it and moves
//! `lead_state`. Domain columns (name, phone, score, ...) ride along in
//! `attributes` untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{LeadId, TeamId};
use super::state::LeadState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: LeadId,
    pub team_id: TeamId,

    /// Stored state; `None` is read as `new`.
    pub lead_state: Option<LeadState>,

    /// Everything else on the row.
    #[serde(default)]
    pub attributes: serde_json::Value,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// A freshly imported lead with no stored state.
    pub fn new(id: LeadId, team_id: TeamId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            team_id,
            lead_state: None,
            attributes: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_state(mut self, state: LeadState) -> Self {
        self.lead_state = Some(state);
        self
    }

    pub fn with_attributes(mut self, attributes: serde_json::Value) -> Self {
        self.attributes = attributes;
        self
    }

    /// Current state with the `None -> new` rule applied.
    pub fn current_state(&self) -> LeadState {
        LeadState::normalize(self.lead_state)
    }
}
