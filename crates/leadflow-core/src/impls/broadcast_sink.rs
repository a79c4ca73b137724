//! BroadcastEventSink - tokio broadcast チャネルへ "lead updated" を流す
//!
//! 購読者がいない・遅れている場合も publish は失敗しない（fire-and-forget）。

use tokio::sync::broadcast;

use crate::domain::LeadUpdated;
use crate::ports::EventSink;

#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    tx: broadcast::Sender<LeadUpdated>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LeadUpdated> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: LeadUpdated) {
        if self.tx.send(event).is_err() {
            tracing::trace!("lead update dropped: no subscribers");
        }
    }
}
