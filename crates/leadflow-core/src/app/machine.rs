//! LeadMachine - ステートマシンの公開面
//!
//! ports を束ねた薄い構造体。操作は役割ごとのファイルに分かれている：
//! - engine: 状態遷移（transition, get_valid_transitions）
//! - timers: タイマーの予約・キャンセル
//! - executors: タイマー発火時のアクション
//! - history: イベントログの読み出しと監査
//! - status: タイマーの監視用集計
//!
//! 構築は [`crate::app::LeadMachineBuilder`] から。

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::LeadMachineConfig;
use crate::ports::{
    Clock, EventSink, IdGenerator, LeadEventRepository, LeadRepository, LeadTimerRepository,
};

/// Clone は Arc のコピーのみ。タスク間で共有して並行に呼べる。
#[derive(Clone)]
pub struct LeadMachine {
    pub(crate) leads: Arc<dyn LeadRepository>,
    pub(crate) events: Arc<dyn LeadEventRepository>,
    pub(crate) timers: Arc<dyn LeadTimerRepository>,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) config: LeadMachineConfig,
}

impl LeadMachine {
    pub fn config(&self) -> &LeadMachineConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl std::fmt::Debug for LeadMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeadMachine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
