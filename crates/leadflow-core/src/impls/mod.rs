//! Impls - 実装（開発用・テスト用）
//!
//! ports の実装。
//!
//! # 含まれる実装
//! - **InMemoryLeadStore**: リード・イベントログ・タイマーの 3 ports をまとめて実装
//! - **BroadcastEventSink**: tokio broadcast による通知
//!
//! 本番用のストア（PostgreSQL など）は別クレートに置く想定。

pub mod broadcast_sink;
pub mod inmem_store;

pub use self::broadcast_sink::BroadcastEventSink;
pub use self::inmem_store::InMemoryLeadStore;
