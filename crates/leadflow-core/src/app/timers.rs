//! Timers - リターゲティング用タイマーの予約とキャンセル
//!
//! 予約は `(lead_id, timer_type)` ごとに pending 1 件まで。
//! 同じリードに何度予約しても重複は黙って無視される。

use serde_json::json;
use tracing::{debug, info};

use crate::app::LeadMachine;
use crate::domain::{LeadError, LeadId, LeadTimer, NewLeadTimer, Payload, TeamId, TimerType};

pub const RETARGET_ACTION: &str = "retarget";
pub const ESCALATE_ACTION: &str = "escalate";

fn template_rotation(enabled: bool) -> Payload {
    let mut payload = Payload::new();
    payload.insert("templateRotation".to_string(), json!(enabled));
    payload
}

impl LeadMachine {
    /// Schedule the no-response (`TIMER_7D`) and escalation (`TIMER_14D`)
    /// timers from now. Returns how many were actually inserted.
    pub async fn schedule_retargeting_timers(
        &self,
        lead_id: LeadId,
        team_id: TeamId,
    ) -> Result<usize, LeadError> {
        let now = self.now();
        let max_attempts = self.config.timer_max_attempts;

        let timers: Vec<LeadTimer> = [
            NewLeadTimer {
                team_id,
                lead_id,
                timer_type: TimerType::Timer7d,
                trigger_at: now + self.config.retarget_after(),
                action: RETARGET_ACTION.to_string(),
                action_payload: template_rotation(false),
                max_attempts,
            },
            NewLeadTimer {
                team_id,
                lead_id,
                timer_type: TimerType::Timer14d,
                trigger_at: now + self.config.escalate_after(),
                action: ESCALATE_ACTION.to_string(),
                action_payload: template_rotation(true),
                max_attempts,
            },
        ]
        .into_iter()
        .map(|t| t.into_timer(self.ids.generate_timer_id(), now))
        .collect();

        let inserted = self.timers.insert_ignore_conflict(timers).await?;
        if inserted > 0 {
            info!(lead_id = %lead_id, inserted, "retargeting timers scheduled");
        } else {
            debug!(lead_id = %lead_id, "retargeting timers already pending");
        }
        Ok(inserted)
    }

    /// Cancel every pending timer of the lead. A lead with none is a no-op.
    pub async fn cancel_all_timers(&self, lead_id: LeadId, reason: &str) -> Result<usize, LeadError> {
        let cancelled = self.timers.cancel_pending(lead_id, reason, self.now()).await?;
        if cancelled > 0 {
            info!(lead_id = %lead_id, cancelled, reason, "timers cancelled");
        }
        Ok(cancelled)
    }

    /// Every timer of the lead, pending or finished.
    pub async fn timers_for_lead(&self, lead_id: LeadId) -> Result<Vec<LeadTimer>, LeadError> {
        Ok(self.timers.list_for_lead(lead_id).await?)
    }
}
