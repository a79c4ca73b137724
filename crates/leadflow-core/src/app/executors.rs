//! Executors - タイマー発火時のアクション
//!
//! 外部のディスパッチャ（[`crate::app::TimerSweeper`] など）から lead id だけで呼ばれる。
//! タイマー行には触れない。`executed_at` を付けるのは呼び出し側の責務。

use serde_json::json;
use tracing::{debug, info};

use crate::app::{LeadMachine, TransitionRequest};
use crate::domain::{
    EventSource, Lead, LeadError, LeadEvent, LeadEventType, LeadId, LeadState, NewLeadEvent,
    Payload, TimerType,
};

pub const RETARGET_REASON: &str = "7-day no response";
pub const ESCALATION_REASON: &str = "14-day escalation";
pub const TEMPLATE_ROTATION_ACTION: &str = "template_rotation";

/// What a timer action did.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerOutcome {
    /// The lead moved; carries the transition event.
    Transitioned(LeadEvent),

    /// Template rotation logged. `transition` is set when the lead was
    /// also moved out of `touched` on the way.
    Rotated {
        transition: Option<LeadEvent>,
        rotation: LeadEvent,
    },

    /// Guard did not match; nothing written.
    Skipped { state: LeadState },
}

impl LeadMachine {
    /// `TIMER_7D`: a lead still in `touched` moves to `retargeting`.
    /// Any other state is left alone.
    pub async fn move_to_retargeting(&self, lead_id: LeadId) -> Result<TimerOutcome, LeadError> {
        let lead = self.load_for_timer(lead_id).await?;
        let current = lead.current_state();
        if current != LeadState::Touched {
            debug!(lead_id = %lead_id, state = %current, "retarget skipped");
            return Ok(TimerOutcome::Skipped { state: current });
        }

        let mut payload = Payload::new();
        payload.insert("reason".into(), json!(RETARGET_REASON));

        match self.timer_transition(&lead, TimerType::Timer7d, payload).await? {
            Some(event) => Ok(TimerOutcome::Transitioned(event)),
            None => Ok(TimerOutcome::Skipped { state: current }),
        }
    }

    /// `TIMER_14D`: rotate the outreach template of a lead in `touched` or
    /// `retargeting`. Any other state is left alone.
    ///
    /// A lead still in `touched` is first moved to `retargeting`. The
    /// `TIMER_14D` rotation event is appended on every run, so a repeated
    /// dispatch records the rotation again.
    pub async fn rotate_template(&self, lead_id: LeadId) -> Result<TimerOutcome, LeadError> {
        let lead = self.load_for_timer(lead_id).await?;
        let current = lead.current_state();
        if !matches!(current, LeadState::Touched | LeadState::Retargeting) {
            debug!(lead_id = %lead_id, state = %current, "template rotation skipped");
            return Ok(TimerOutcome::Skipped { state: current });
        }

        let transition = if current == LeadState::Touched {
            let mut payload = Payload::new();
            payload.insert("reason".into(), json!(ESCALATION_REASON));
            payload.insert("templateRotation".into(), json!(true));
            match self.timer_transition(&lead, TimerType::Timer14d, payload).await? {
                Some(event) => Some(event),
                None => {
                    // lost a race to a transition away from touched
                    let state = self.load_for_timer(lead_id).await?.current_state();
                    if state != LeadState::Retargeting {
                        return Ok(TimerOutcome::Skipped { state });
                    }
                    None
                }
            }
        } else {
            None
        };

        let mut payload = Payload::new();
        payload.insert("action".into(), json!(TEMPLATE_ROTATION_ACTION));
        payload.insert("triggeredBy".into(), json!(TimerType::Timer14d.as_str()));

        let rotation = NewLeadEvent {
            tenant_id: lead.team_id.to_string(),
            team_id: lead.team_id,
            lead_id,
            event_type: LeadEventType::Timer14d,
            event_source: EventSource::Timer,
            previous_state: Some(LeadState::Retargeting),
            new_state: None,
            payload,
        }
        .into_event(self.ids.generate_event_id(), self.now());
        let rotation = self.events.append(rotation).await?;

        info!(lead_id = %lead_id, "template rotated");
        Ok(TimerOutcome::Rotated {
            transition,
            rotation,
        })
    }

    async fn load_for_timer(&self, lead_id: LeadId) -> Result<Lead, LeadError> {
        self.leads
            .get(lead_id)
            .await?
            .ok_or_else(|| LeadError::lead_not_found(lead_id))
    }

    /// touched -> retargeting on behalf of a timer. `None` when the lead
    /// moved concurrently and the guard no longer holds.
    async fn timer_transition(
        &self,
        lead: &Lead,
        timer_type: TimerType,
        payload: Payload,
    ) -> Result<Option<LeadEvent>, LeadError> {
        let request = TransitionRequest::new(lead.id, lead.team_id, LeadState::Retargeting)
            .triggered_by(timer_type.as_str())
            .source(EventSource::Timer)
            .event_type(match timer_type {
                TimerType::Timer14d => LeadEventType::Timer14d,
                _ => LeadEventType::Timer7d,
            })
            .payload(payload);

        match self.transition(request).await {
            Ok(outcome) => Ok(Some(outcome.event)),
            Err(LeadError::InvalidTransition { from, .. }) => {
                debug!(lead_id = %lead.id, state = %from, "lead moved before timer applied");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
