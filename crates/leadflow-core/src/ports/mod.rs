//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。各 trait は外部システム
//! （リードストア、イベントログ、タイマーテーブル、通知バス）への
//! インターフェースで、実装の詳細を隠蔽する。
//!
//! # 設計原則
//! - リードの状態とイベントログは同一トランザクションで書く
//! - タイマーは削除せず、実行済み／キャンセル済みの印で終了させる
//! - 時刻と ID は Clock / IdGenerator 経由（テストで差し替え可能）

pub mod clock;
pub mod event_log;
pub mod event_sink;
pub mod id_generator;
pub mod lead_store;
pub mod timer_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_log::LeadEventRepository;
pub use self::event_sink::{EventSink, NoopEventSink};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::lead_store::{LeadRepository, TransitionWrite};
pub use self::timer_store::LeadTimerRepository;
pub use crate::domain::StoreError;
