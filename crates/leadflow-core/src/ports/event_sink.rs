//! EventSink port - 遷移コミット後の通知
//!
//! fire-and-forget。publish は失敗を返さず、遷移結果にも影響しない。

use crate::domain::LeadUpdated;

/// EventSink は "lead updated" 通知を外部の購読者へ流す
///
/// # 実装
/// - NoopEventSink: 何もしない（デフォルト）
/// - BroadcastEventSink: tokio broadcast チャネル（impls）
pub trait EventSink: Send + Sync {
    fn publish(&self, event: LeadUpdated);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn publish(&self, _event: LeadUpdated) {}
}
