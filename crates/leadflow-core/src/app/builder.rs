//! LeadMachineBuilder - ports のワイヤリングと起動時検証
//!
//! # Fail-fast 設計
//! - リポジトリ 3 種は必須。欠けていれば build() が `BuildError::MissingPort` を返す
//! - 設定は build() 時に validate する
//! - Clock / IdGenerator / EventSink は省略可（SystemClock / UlidGenerator / NoopEventSink）

use std::sync::Arc;

use crate::app::LeadMachine;
use crate::config::{ConfigError, LeadMachineConfig};
use crate::ports::{
    Clock, EventSink, IdGenerator, LeadEventRepository, LeadRepository, LeadTimerRepository,
    NoopEventSink, SystemClock, UlidGenerator,
};

/// BuildError は構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing port: {0}. Register it on the builder before build().")]
    MissingPort(&'static str),

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

/// # 使用例
/// ```ignore
/// let store = InMemoryLeadStore::new();
/// let machine = LeadMachineBuilder::new()
///     .store(store)
///     .clock(FixedClock::new(start))
///     .build()?;
/// ```
#[derive(Default)]
pub struct LeadMachineBuilder {
    leads: Option<Arc<dyn LeadRepository>>,
    events: Option<Arc<dyn LeadEventRepository>>,
    timers: Option<Arc<dyn LeadTimerRepository>>,
    sink: Option<Arc<dyn EventSink>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    config: LeadMachineConfig,
}

impl LeadMachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lead_repository(mut self, repo: impl LeadRepository + 'static) -> Self {
        self.leads = Some(Arc::new(repo));
        self
    }

    pub fn event_repository(mut self, repo: impl LeadEventRepository + 'static) -> Self {
        self.events = Some(Arc::new(repo));
        self
    }

    pub fn timer_repository(mut self, repo: impl LeadTimerRepository + 'static) -> Self {
        self.timers = Some(Arc::new(repo));
        self
    }

    /// One backend for all three repositories.
    pub fn store<S>(mut self, store: S) -> Self
    where
        S: LeadRepository + LeadEventRepository + LeadTimerRepository + 'static,
    {
        let store = Arc::new(store);
        self.leads = Some(store.clone());
        self.events = Some(store.clone());
        self.timers = Some(store);
        self
    }

    pub fn event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Some(Arc::new(ids));
        self
    }

    pub fn config(mut self, config: LeadMachineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<LeadMachine, BuildError> {
        let leads = self.leads.ok_or(BuildError::MissingPort("LeadRepository"))?;
        let events = self
            .events
            .ok_or(BuildError::MissingPort("LeadEventRepository"))?;
        let timers = self
            .timers
            .ok_or(BuildError::MissingPort("LeadTimerRepository"))?;
        self.config.validate()?;

        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(clock.clone())),
        };
        let sink: Arc<dyn EventSink> = self.sink.unwrap_or_else(|| Arc::new(NoopEventSink));

        Ok(LeadMachine {
            leads,
            events,
            timers,
            sink,
            clock,
            ids,
            config: self.config,
        })
    }
}
