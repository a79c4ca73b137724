//! InMemoryLeadStore - 開発用・テスト用のリード／イベント／タイマーストア
//!
//! 3 つのリポジトリ port を 1 つの `tokio::sync::Mutex` の下で実装する。
//! ロック 1 つなので `apply_transition` の「状態更新 + イベント追記」は
//! 自然に原子的になり、compare-and-swap もロック内で判定できる。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    Lead, LeadEvent, LeadId, LeadTimer, LeadTimerId, StoreError, TeamId,
};
use crate::ports::{LeadEventRepository, LeadRepository, LeadTimerRepository, TransitionWrite};

/// In-memory store state.
#[derive(Default)]
struct InMemoryState {
    leads: HashMap<LeadId, Lead>,

    /// Append-only, in write order.
    events: Vec<LeadEvent>,

    /// In insertion order. Never removed.
    timers: Vec<LeadTimer>,
}

impl InMemoryState {
    fn timer_mut(&mut self, id: LeadTimerId) -> Result<&mut LeadTimer, StoreError> {
        self.timers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::TimerNotFound(id))
    }
}

/// Clone すると同じストアを共有する。
#[derive(Clone, Default)]
pub struct InMemoryLeadStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a lead row (the lead store proper is external).
    pub async fn insert_lead(&self, lead: Lead) {
        let mut state = self.state.lock().await;
        state.leads.insert(lead.id, lead);
    }

    /// Snapshot of the whole event log, in write order.
    pub async fn all_events(&self) -> Vec<LeadEvent> {
        self.state.lock().await.events.clone()
    }

    /// Snapshot of every timer, in insertion order.
    pub async fn all_timers(&self) -> Vec<LeadTimer> {
        self.state.lock().await.timers.clone()
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadStore {
    async fn find_by_id(&self, id: LeadId, team_id: TeamId) -> Result<Option<Lead>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .leads
            .get(&id)
            .filter(|lead| lead.team_id == team_id)
            .cloned())
    }

    async fn get(&self, id: LeadId) -> Result<Option<Lead>, StoreError> {
        Ok(self.state.lock().await.leads.get(&id).cloned())
    }

    async fn apply_transition(
        &self,
        write: TransitionWrite,
    ) -> Result<(Lead, LeadEvent), StoreError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let lead = state
            .leads
            .get_mut(&write.lead_id)
            .filter(|lead| lead.team_id == write.team_id)
            .ok_or(StoreError::LeadNotFound(write.lead_id))?;

        let actual = lead.current_state();
        if actual != write.expected {
            return Err(StoreError::StateConflict {
                lead_id: write.lead_id,
                expected: write.expected,
                actual,
            });
        }

        lead.lead_state = Some(write.new_state);
        lead.updated_at = write.updated_at;
        let lead = lead.clone();

        state.events.push(write.event.clone());
        Ok((lead, write.event))
    }
}

#[async_trait]
impl LeadEventRepository for InMemoryLeadStore {
    async fn append(&self, event: LeadEvent) -> Result<LeadEvent, StoreError> {
        let mut state = self.state.lock().await;
        state.events.push(event.clone());
        Ok(event)
    }

    async fn list_for_lead(&self, lead_id: LeadId) -> Result<Vec<LeadEvent>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .iter()
            .filter(|e| e.lead_id == lead_id)
            .cloned()
            .collect())
    }

    async fn list_for_team(
        &self,
        team_id: TeamId,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<LeadEvent>, StoreError> {
        let state = self.state.lock().await;
        let mut events: Vec<LeadEvent> = state
            .events
            .iter()
            .filter(|e| e.team_id == team_id)
            .filter(|e| since.is_none_or(|s| e.processed_at >= s))
            .filter(|e| until.is_none_or(|u| e.processed_at <= u))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.processed_at);
        Ok(events)
    }
}

#[async_trait]
impl LeadTimerRepository for InMemoryLeadStore {
    async fn insert_ignore_conflict(&self, timers: Vec<LeadTimer>) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        let mut inserted = 0;
        for timer in timers {
            let duplicate = state.timers.iter().any(|t| {
                t.is_pending() && t.lead_id == timer.lead_id && t.timer_type == timer.timer_type
            });
            if duplicate {
                continue;
            }
            state.timers.push(timer);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn cancel_pending(
        &self,
        lead_id: LeadId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        let cancelled = state
            .timers
            .iter_mut()
            .filter(|t| t.lead_id == lead_id)
            .map(|t| t.cancel(reason, at))
            .filter(|changed| *changed)
            .count();
        Ok(cancelled)
    }

    async fn due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<LeadTimer>, StoreError> {
        let state = self.state.lock().await;
        let mut due: Vec<LeadTimer> = state
            .timers
            .iter()
            .filter(|t| t.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|t| t.trigger_at);
        due.truncate(limit);
        Ok(due)
    }

    async fn mark_executed(&self, id: LeadTimerId, at: DateTime<Utc>) -> Result<LeadTimer, StoreError> {
        let mut state = self.state.lock().await;
        let timer = state.timer_mut(id)?;
        if timer.is_pending() {
            timer.mark_executed(at);
        }
        Ok(timer.clone())
    }

    async fn record_failure(
        &self,
        id: LeadTimerId,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<LeadTimer, StoreError> {
        let mut state = self.state.lock().await;
        let timer = state.timer_mut(id)?;
        timer.record_failure(error.to_string(), at);
        Ok(timer.clone())
    }

    async fn cancel(
        &self,
        id: LeadTimerId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<LeadTimer, StoreError> {
        let mut state = self.state.lock().await;
        let timer = state.timer_mut(id)?;
        timer.cancel(reason, at);
        Ok(timer.clone())
    }

    async fn list_for_lead(&self, lead_id: LeadId) -> Result<Vec<LeadTimer>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .timers
            .iter()
            .filter(|t| t.lead_id == lead_id)
            .cloned()
            .collect())
    }

    async fn list_pending(&self) -> Result<Vec<LeadTimer>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.timers.iter().filter(|t| t.is_pending()).cloned().collect())
    }
}
