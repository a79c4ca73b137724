//! App - アプリケーション層
//!
//! ports を組み合わせてステートマシンを実装する。
//!
//! # 主要コンポーネント
//! - **LeadMachineBuilder**: ports のワイヤリングと起動時検証
//! - **LeadMachine**: 公開操作（遷移、タイマー、履歴、集計）
//! - **TimerSweeper**: 期限到来タイマーの実行（外部 cron から 1 回ずつ呼ぶ）

pub mod builder;
pub mod engine;
pub mod executors;
pub mod history;
pub mod machine;
pub mod status;
pub mod sweeper;
pub mod timers;

#[cfg(test)]
pub(crate) mod testing;

pub use self::builder::{BuildError, LeadMachineBuilder};
pub use self::engine::{DEFAULT_TRIGGERED_BY, TransitionOutcome, TransitionRequest};
pub use self::executors::TimerOutcome;
pub use self::history::{
    AuditEntry, EventQuery, ReconstructedState, StateChange, StateVerification,
};
pub use self::machine::LeadMachine;
pub use self::status::TimerStats;
pub use self::sweeper::{SweepReport, TimerSweeper};
