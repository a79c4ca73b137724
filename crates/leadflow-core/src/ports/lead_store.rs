//! LeadRepository port - リードの正本（source of truth）
//!
//! リード行そのものは外部のリードストアが所有する。このクレートが書くのは
//! `lead_state` と `updated_at` だけで、それも必ずイベント追記と同一トランザクション。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Lead, LeadEvent, LeadId, LeadState, StoreError, TeamId};

/// 1 回の状態遷移で書き込む内容
///
/// `expected` は検証時に読んだ（正規化済みの）状態。保存値がこれと
/// 一致しない場合、書き込みは行われず `StoreError::StateConflict` になる。
#[derive(Debug, Clone)]
pub struct TransitionWrite {
    pub lead_id: LeadId,
    pub team_id: TeamId,
    pub expected: LeadState,
    pub new_state: LeadState,
    pub updated_at: DateTime<Utc>,
    pub event: LeadEvent,
}

/// LeadRepository はリードの読み出しと状態遷移の書き込み
///
/// # 設計原則
/// - `apply_transition` は状態更新とイベント追記を原子的に行う（片方だけは残らない）
/// - compare-and-swap で同一リードへの並行遷移を直列化する
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// チームスコープ付きの読み出し。別チームのリードは `None`。
    async fn find_by_id(&self, id: LeadId, team_id: TeamId) -> Result<Option<Lead>, StoreError>;

    /// チームを問わない読み出し（タイマー実行側はリード ID しか持たない）。
    async fn get(&self, id: LeadId) -> Result<Option<Lead>, StoreError>;

    /// Atomically set `lead_state` and append `write.event`.
    ///
    /// Returns the updated lead and the stored event.
    async fn apply_transition(&self, write: TransitionWrite)
    -> Result<(Lead, LeadEvent), StoreError>;
}
