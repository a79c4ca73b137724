//! History - イベントログの読み出し・再構築・監査
//!
//! イベントログは追記専用なので、リードの `lead_state` とは独立に
//! 履歴から状態を再構築できる。verify はその 2 つを突き合わせる。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::LeadMachine;
use crate::domain::{
    EventSource, LeadError, LeadEvent, LeadEventType, LeadId, LeadState, Payload, TeamId,
};

pub const DEFAULT_RECENT_EVENTS: usize = 10;

/// Filter for [`LeadMachine::lead_events`]. Default is "everything".
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub limit: Option<usize>,
    pub offset: usize,
    /// Keep only these types. `None` keeps all.
    pub event_types: Option<Vec<LeadEventType>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub previous_state: Option<LeadState>,
    pub new_state: LeadState,
    pub event_type: LeadEventType,
    pub timestamp: DateTime<Utc>,
    pub source: EventSource,
    pub triggered_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructedState {
    pub current_state: LeadState,
    pub event_count: usize,
    pub last_event_at: Option<DateTime<Utc>>,
    pub state_transitions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateVerification {
    pub is_valid: bool,
    /// Stored state, normalized (`None` reads as `new`).
    pub stored_state: LeadState,
    pub reconstructed_state: LeadState,
    pub discrepancy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event_type: LeadEventType,
    pub source: EventSource,
    /// `"touched → closed"` when both ends are recorded.
    pub state_change: Option<String>,
    pub details: Payload,
}

/// Replay oldest-first events starting from `new`.
pub fn replay(events: &[LeadEvent]) -> ReconstructedState {
    let mut current_state = LeadState::New;
    let mut state_transitions = 0;
    for state in events.iter().filter_map(|e| e.new_state) {
        current_state = state;
        state_transitions += 1;
    }
    ReconstructedState {
        current_state,
        event_count: events.len(),
        last_event_at: events.last().map(|e| e.processed_at),
        state_transitions,
    }
}

impl LeadMachine {
    /// Events of one lead, newest first.
    pub async fn lead_events(
        &self,
        lead_id: LeadId,
        query: EventQuery,
    ) -> Result<Vec<LeadEvent>, LeadError> {
        let mut events = self.events.list_for_lead(lead_id).await?;
        events.reverse();

        let events = events
            .into_iter()
            .filter(|e| {
                query
                    .event_types
                    .as_ref()
                    .is_none_or(|types| types.contains(&e.event_type))
            })
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(events)
    }

    /// The last `count` events, newest first.
    pub async fn recent_events(
        &self,
        lead_id: LeadId,
        count: usize,
    ) -> Result<Vec<LeadEvent>, LeadError> {
        self.lead_events(
            lead_id,
            EventQuery {
                limit: Some(count),
                ..EventQuery::default()
            },
        )
        .await
    }

    /// Only the events that moved the lead, newest first.
    pub async fn state_history(&self, lead_id: LeadId) -> Result<Vec<StateChange>, LeadError> {
        let events = self.lead_events(lead_id, EventQuery::default()).await?;
        Ok(events
            .into_iter()
            .filter_map(|e| {
                let new_state = e.new_state?;
                Some(StateChange {
                    previous_state: e.previous_state,
                    new_state,
                    event_type: e.event_type,
                    timestamp: e.processed_at,
                    triggered_by: e.triggered_by().map(str::to_string),
                    source: e.event_source,
                })
            })
            .collect())
    }

    pub async fn reconstruct_state(&self, lead_id: LeadId) -> Result<ReconstructedState, LeadError> {
        let events = self.events.list_for_lead(lead_id).await?;
        Ok(replay(&events))
    }

    /// Compare the stored state against the replayed event log.
    pub async fn verify_lead_state(
        &self,
        lead_id: LeadId,
        team_id: TeamId,
    ) -> Result<StateVerification, LeadError> {
        let lead = self
            .leads
            .find_by_id(lead_id, team_id)
            .await?
            .ok_or_else(|| LeadError::lead_not_found(lead_id))?;
        let stored_state = lead.current_state();
        let reconstructed_state = self.reconstruct_state(lead_id).await?.current_state;

        let is_valid = stored_state == reconstructed_state;
        let discrepancy = (!is_valid).then(|| {
            format!(
                "stored state is '{stored_state}' but event history shows '{reconstructed_state}'"
            )
        });
        if let Some(msg) = &discrepancy {
            tracing::warn!(lead_id = %lead_id, "{msg}");
        }

        Ok(StateVerification {
            is_valid,
            stored_state,
            reconstructed_state,
            discrepancy,
        })
    }

    /// Every event of the lead as an audit line, newest first.
    pub async fn audit_trail(&self, lead_id: LeadId) -> Result<Vec<AuditEntry>, LeadError> {
        let events = self.lead_events(lead_id, EventQuery::default()).await?;
        Ok(events
            .into_iter()
            .map(|e| AuditEntry {
                timestamp: e.processed_at,
                event_type: e.event_type,
                state_change: match (e.previous_state, e.new_state) {
                    (Some(from), Some(to)) => Some(format!("{from} → {to}")),
                    _ => None,
                },
                source: e.event_source,
                details: e.payload,
            })
            .collect())
    }

    /// Event counts per type for a team, optionally since a point in time.
    pub async fn event_stats(
        &self,
        team_id: TeamId,
        since: Option<DateTime<Utc>>,
    ) -> Result<BTreeMap<LeadEventType, usize>, LeadError> {
        let events = self.events.list_for_team(team_id, since, None).await?;
        let mut stats = BTreeMap::new();
        for event in events {
            *stats.entry(event.event_type).or_insert(0) += 1;
        }
        Ok(stats)
    }

    /// Team events in `[start, end]`, oldest first.
    pub async fn export_team_events(
        &self,
        team_id: TeamId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LeadEvent>, LeadError> {
        Ok(self
            .events
            .list_for_team(team_id, Some(start), Some(end))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::TransitionRequest;
    use crate::app::testing::{Harness, t0};
    use crate::domain::{Lead, LeadEventId, NewLeadEvent};
    use crate::ports::LeadEventRepository;
    use chrono::Duration;

    /// new -> touched -> responded -> high_intent, one hour apart.
    async fn walked_lead(h: &Harness) -> Lead {
        let lead = h.lead(None).await;
        for to in [LeadState::Touched, LeadState::Responded, LeadState::HighIntent] {
            h.machine
                .transition(TransitionRequest::new(lead.id, lead.team_id, to))
                .await
                .unwrap();
            h.clock.advance(Duration::hours(1));
        }
        lead
    }

    async fn note(h: &Harness, lead: &Lead, event_type: LeadEventType) {
        let event = NewLeadEvent {
            tenant_id: lead.team_id.to_string(),
            team_id: lead.team_id,
            lead_id: lead.id,
            event_type,
            event_source: EventSource::Other("worker".into()),
            previous_state: None,
            new_state: None,
            payload: Payload::new(),
        }
        .into_event(LeadEventId::random(), h.clock_now());
        h.store.append(event).await.unwrap();
    }

    #[tokio::test]
    async fn lead_events_are_newest_first_and_filterable() {
        let h = Harness::new();
        let lead = walked_lead(&h).await;
        note(&h, &lead, LeadEventType::SmsSent).await;

        let all = h.machine.lead_events(lead.id, EventQuery::default()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].event_type, LeadEventType::SmsSent);
        assert_eq!(all[3].new_state, Some(LeadState::Touched));

        let page = h
            .machine
            .lead_events(
                lead.id,
                EventQuery {
                    limit: Some(2),
                    offset: 1,
                    event_types: Some(vec![LeadEventType::StateChanged]),
                },
            )
            .await
            .unwrap();
        let states: Vec<_> = page.iter().map(|e| e.new_state).collect();
        assert_eq!(states, vec![Some(LeadState::Responded), Some(LeadState::Touched)]);

        let recent = h.machine.recent_events(lead.id, 1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].event_type, LeadEventType::SmsSent);
    }

    #[tokio::test]
    async fn state_history_skips_informational_events() {
        let h = Harness::new();
        let lead = walked_lead(&h).await;
        note(&h, &lead, LeadEventType::EmailSent).await;

        let history = h.machine.state_history(lead.id).await.unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(history[0].new_state, LeadState::HighIntent);
        assert_eq!(history[0].previous_state, Some(LeadState::Responded));
        assert_eq!(history[0].triggered_by.as_deref(), Some("SYSTEM"));
        assert_eq!(history[2].timestamp, t0());
    }

    #[tokio::test]
    async fn reconstruct_replays_from_new() {
        let h = Harness::new();
        let lead = walked_lead(&h).await;
        note(&h, &lead, LeadEventType::CallOutbound).await;

        let r = h.machine.reconstruct_state(lead.id).await.unwrap();

        assert_eq!(r.current_state, LeadState::HighIntent);
        assert_eq!(r.event_count, 4);
        assert_eq!(r.state_transitions, 3);
        assert_eq!(r.last_event_at, Some(t0() + Duration::hours(3)));

        let empty = h.machine.reconstruct_state(LeadId::random()).await.unwrap();
        assert_eq!(empty.current_state, LeadState::New);
        assert_eq!(empty.last_event_at, None);
    }

    #[tokio::test]
    async fn verify_agrees_for_machine_written_leads() {
        let h = Harness::new();
        let walked = walked_lead(&h).await;
        let untouched = h.lead(None).await;

        let v = h.machine.verify_lead_state(walked.id, walked.team_id).await.unwrap();
        assert!(v.is_valid);
        assert_eq!(v.discrepancy, None);

        let v = h
            .machine
            .verify_lead_state(untouched.id, untouched.team_id)
            .await
            .unwrap();
        assert!(v.is_valid, "unset state and empty log both mean new");
    }

    #[tokio::test]
    async fn verify_reports_drift() {
        let h = Harness::new();
        let lead = h.lead(Some(LeadState::Responded)).await;

        let v = h.machine.verify_lead_state(lead.id, lead.team_id).await.unwrap();

        assert!(!v.is_valid);
        assert_eq!(v.stored_state, LeadState::Responded);
        assert_eq!(v.reconstructed_state, LeadState::New);
        assert_eq!(
            v.discrepancy.as_deref(),
            Some("stored state is 'responded' but event history shows 'new'")
        );
    }

    #[tokio::test]
    async fn audit_trail_formats_state_changes() {
        let h = Harness::new();
        let lead = walked_lead(&h).await;
        note(&h, &lead, LeadEventType::SmsReceived).await;

        let trail = h.machine.audit_trail(lead.id).await.unwrap();

        assert_eq!(trail.len(), 4);
        assert_eq!(trail[0].state_change, None);
        assert_eq!(trail[0].source, EventSource::Other("worker".into()));
        assert_eq!(trail[1].state_change.as_deref(), Some("responded → high_intent"));
        assert_eq!(trail[3].state_change.as_deref(), Some("new → touched"));
        assert_eq!(trail[3].details["triggeredBy"], "SYSTEM");
    }

    #[tokio::test]
    async fn stats_and_export_are_team_scoped() {
        let h = Harness::new();
        let lead = walked_lead(&h).await;
        note(&h, &lead, LeadEventType::SmsSent).await;
        note(&h, &lead, LeadEventType::SmsSent).await;

        let stats = h.machine.event_stats(h.team_id, None).await.unwrap();
        assert_eq!(stats[&LeadEventType::StateChanged], 3);
        assert_eq!(stats[&LeadEventType::SmsSent], 2);

        let since = h.machine.event_stats(h.team_id, Some(t0() + Duration::hours(2))).await.unwrap();
        assert_eq!(since[&LeadEventType::StateChanged], 1);

        let exported = h
            .machine
            .export_team_events(h.team_id, t0(), t0() + Duration::hours(1))
            .await
            .unwrap();
        let states: Vec<_> = exported.iter().map(|e| e.new_state).collect();
        assert_eq!(states, vec![Some(LeadState::Touched), Some(LeadState::Responded)]);

        assert!(h.machine.event_stats(TeamId::random(), None).await.unwrap().is_empty());
    }
}
