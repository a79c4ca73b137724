//! Engine - 状態遷移
//!
//! # フロー
//! 1. リードを (id, team) で読む。無ければ NotFound
//! 2. 保存値を正規化（未設定は new）
//! 3. 遷移表で検証。不正なら InvalidTransition（書き込みなし）
//! 4. 状態更新 + イベント追記を 1 回の compare-and-swap で書く
//! 5. 副作用（タイマーのキャンセル／予約）はベストエフォート
//! 6. "lead updated" を通知
//!
//! compare-and-swap に負けた場合は読み直して 3 からやり直す。
//! 読み直した状態からの遷移が不正なら、その時点で InvalidTransition になる。

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::app::LeadMachine;
use crate::domain::{
    EventSource, Lead, LeadError, LeadEvent, LeadEventType, LeadId, LeadState, LeadUpdated,
    NewLeadEvent, Payload, StoreError, TeamId, is_valid_transition, valid_transitions,
};
use crate::ports::TransitionWrite;

/// `triggeredBy` when the caller does not name one.
pub const DEFAULT_TRIGGERED_BY: &str = "SYSTEM";

/// 1 回の遷移要求
///
/// # 使用例
/// ```ignore
/// let req = TransitionRequest::new(lead_id, team_id, LeadState::Responded)
///     .triggered_by("gianna")
///     .source("signalhouse")
///     .event_type(LeadEventType::SmsReceived)
///     .with("messageId", json!("SM123"));
/// ```
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub lead_id: LeadId,
    pub team_id: TeamId,
    pub to: LeadState,
    pub triggered_by: String,
    pub source: EventSource,
    pub event_type: LeadEventType,
    pub payload: Payload,
}

impl TransitionRequest {
    pub fn new(lead_id: LeadId, team_id: TeamId, to: LeadState) -> Self {
        Self {
            lead_id,
            team_id,
            to,
            triggered_by: DEFAULT_TRIGGERED_BY.to_string(),
            source: EventSource::System,
            event_type: LeadEventType::StateChanged,
            payload: Payload::new(),
        }
    }

    pub fn triggered_by(mut self, who: impl Into<String>) -> Self {
        self.triggered_by = who.into();
        self
    }

    pub fn source(mut self, source: impl Into<EventSource>) -> Self {
        self.source = source.into();
        self
    }

    pub fn event_type(mut self, event_type: LeadEventType) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// `{triggeredBy, ...payload}`: caller keys win on collision.
    fn event_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert(
            "triggeredBy".to_string(),
            Value::String(self.triggered_by.clone()),
        );
        payload.extend(self.payload.clone());
        payload
    }
}

/// 成功した遷移の結果。呼び出し側は再取得なしで結果と監査レコードを表示できる。
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub lead: Lead,
    pub event: LeadEvent,
    pub previous_state: LeadState,
    pub new_state: LeadState,
}

impl LeadMachine {
    /// Allowed next states of `current`, in table order.
    pub fn get_valid_transitions(&self, current: LeadState) -> Vec<LeadState> {
        valid_transitions(current)
    }

    /// Move a lead to `request.to`.
    ///
    /// On error nothing was written. Timer side effects that fail after the
    /// commit are logged and do not turn a success into an error.
    pub async fn transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, LeadError> {
        let max_attempts = self.config.max_conflict_retries + 1;
        let mut attempt = 0;

        let (lead, event, previous_state) = loop {
            attempt += 1;

            let lead = self
                .leads
                .find_by_id(request.lead_id, request.team_id)
                .await?
                .ok_or_else(|| LeadError::lead_not_found(request.lead_id))?;
            let current = lead.current_state();

            if !is_valid_transition(current, request.to) {
                debug!(
                    lead_id = %request.lead_id,
                    from = %current,
                    to = %request.to,
                    "transition rejected"
                );
                return Err(LeadError::InvalidTransition {
                    from: current,
                    to: request.to,
                    allowed: valid_transitions(current),
                });
            }

            let now = self.now();
            let event = NewLeadEvent {
                tenant_id: request.team_id.to_string(),
                team_id: request.team_id,
                lead_id: request.lead_id,
                event_type: request.event_type,
                event_source: request.source.clone(),
                previous_state: Some(current),
                new_state: Some(request.to),
                payload: request.event_payload(),
            }
            .into_event(self.ids.generate_event_id(), now);

            let write = TransitionWrite {
                lead_id: request.lead_id,
                team_id: request.team_id,
                expected: current,
                new_state: request.to,
                updated_at: now,
                event,
            };

            match self.leads.apply_transition(write).await {
                Ok((lead, event)) => break (lead, event, current),
                Err(StoreError::StateConflict { actual, .. }) if attempt < max_attempts => {
                    debug!(
                        lead_id = %request.lead_id,
                        expected = %current,
                        %actual,
                        attempt,
                        "lead changed concurrently, re-validating"
                    );
                }
                Err(StoreError::StateConflict { .. }) => {
                    warn!(lead_id = %request.lead_id, attempt, "giving up on contended lead");
                    return Err(LeadError::Conflict {
                        lead_id: request.lead_id,
                        attempts: attempt,
                    });
                }
                Err(StoreError::LeadNotFound(id)) => return Err(LeadError::lead_not_found(id)),
                Err(e) => return Err(e.into()),
            }
        };

        let new_state = request.to;
        info!(
            lead_id = %lead.id,
            team_id = %lead.team_id,
            from = %previous_state,
            to = %new_state,
            source = %event.event_source,
            "lead transitioned"
        );

        self.dispatch_side_effects(&lead, previous_state, new_state)
            .await;

        self.sink.publish(LeadUpdated {
            lead_id: lead.id,
            team_id: lead.team_id,
            event_id: event.id,
            previous_state,
            new_state,
            occurred_at: event.processed_at,
        });

        Ok(TransitionOutcome {
            lead,
            event,
            previous_state,
            new_state,
        })
    }

    async fn dispatch_side_effects(&self, lead: &Lead, previous: LeadState, new: LeadState) {
        if new.is_terminal() {
            let reason = format!("Lead moved to {new}");
            if let Err(e) = self.cancel_all_timers(lead.id, &reason).await {
                warn!(lead_id = %lead.id, error = %e, "failed to cancel timers");
            }
        }

        if previous == LeadState::New
            && new == LeadState::Touched
            && let Err(e) = self.schedule_retargeting_timers(lead.id, lead.team_id).await
        {
            warn!(lead_id = %lead.id, error = %e, "failed to schedule retargeting timers");
        }
    }
}
