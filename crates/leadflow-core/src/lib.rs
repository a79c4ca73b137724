//! leadflow-core
//!
//! Canonical lead state machine: transition table, transition engine,
//! append-only event log, and retargeting timers.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, state, transitions, lead, events, timer, errors）
//! - **ports**: 抽象化レイヤー（LeadRepository, LeadEventRepository, LeadTimerRepository, EventSink, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（builder, engine, timers, executors, sweeper, history, status）
//! - **impls**: 実装（InMemoryLeadStore など開発用）
//! - **config**: TOML 設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{LeadMachine, LeadMachineBuilder, TimerSweeper, TransitionOutcome, TransitionRequest};
pub use config::{ConfigError, LeadMachineConfig};
pub use domain::{LeadError, LeadState};
