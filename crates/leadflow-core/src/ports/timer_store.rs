//! LeadTimerRepository port - 遅延アクションの保存先
//!
//! タイマーは削除しない。終了は `executed_at` か `cancelled_at` のどちらかで表す。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{LeadId, LeadTimer, LeadTimerId, StoreError};

#[async_trait]
pub trait LeadTimerRepository: Send + Sync {
    /// Insert timers, silently skipping any whose `(lead_id, timer_type)`
    /// already has a pending timer. Returns how many were inserted.
    async fn insert_ignore_conflict(&self, timers: Vec<LeadTimer>) -> Result<usize, StoreError>;

    /// Cancel every pending timer of the lead. Returns how many changed.
    async fn cancel_pending(
        &self,
        lead_id: LeadId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// Pending timers with `trigger_at <= now`, oldest trigger first.
    async fn due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<LeadTimer>, StoreError>;

    async fn mark_executed(&self, id: LeadTimerId, at: DateTime<Utc>) -> Result<LeadTimer, StoreError>;

    async fn record_failure(
        &self,
        id: LeadTimerId,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<LeadTimer, StoreError>;

    /// Cancel a single timer. Already-finished timers are returned unchanged.
    async fn cancel(
        &self,
        id: LeadTimerId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<LeadTimer, StoreError>;

    /// Every timer of the lead (pending or not), oldest first.
    async fn list_for_lead(&self, lead_id: LeadId) -> Result<Vec<LeadTimer>, StoreError>;

    /// All pending timers, for monitoring.
    async fn list_pending(&self) -> Result<Vec<LeadTimer>, StoreError>;
}
