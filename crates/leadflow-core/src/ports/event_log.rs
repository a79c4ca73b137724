//! LeadEventRepository port - 追記専用の監査ログ
//!
//! 更新・削除の操作は存在しない。遷移イベントは `LeadRepository::apply_transition`
//! 経由で書かれ、ここの `append` は状態を動かさない情報イベント用。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{LeadEvent, LeadId, StoreError, TeamId};

#[async_trait]
pub trait LeadEventRepository: Send + Sync {
    async fn append(&self, event: LeadEvent) -> Result<LeadEvent, StoreError>;

    /// All events of one lead, oldest first.
    async fn list_for_lead(&self, lead_id: LeadId) -> Result<Vec<LeadEvent>, StoreError>;

    /// Team events with `since <= processed_at <= until`, oldest first.
    /// A missing bound is open.
    async fn list_for_team(
        &self,
        team_id: TeamId,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<LeadEvent>, StoreError>;
}
