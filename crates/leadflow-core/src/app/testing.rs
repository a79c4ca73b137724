//! Test harness shared by the app tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::app::{LeadMachine, LeadMachineBuilder};
use crate::config::LeadMachineConfig;
use crate::domain::{Lead, LeadId, LeadState, TeamId};
use crate::impls::{BroadcastEventSink, InMemoryLeadStore};
use crate::ports::FixedClock;

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
}

pub(crate) struct Harness {
    pub machine: LeadMachine,
    pub store: InMemoryLeadStore,
    pub clock: FixedClock,
    pub sink: BroadcastEventSink,
    pub team_id: TeamId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(LeadMachineConfig::default())
    }

    pub fn with_config(config: LeadMachineConfig) -> Self {
        let store = InMemoryLeadStore::new();
        let clock = FixedClock::new(t0());
        let sink = BroadcastEventSink::new(64);
        let machine = LeadMachineBuilder::new()
            .store(store.clone())
            .clock(clock.clone())
            .event_sink(sink.clone())
            .config(config)
            .build()
            .unwrap();
        Self {
            machine,
            store,
            clock,
            sink,
            team_id: TeamId::random(),
        }
    }

    /// Seed a lead. `None` leaves `lead_state` unset.
    pub async fn lead(&self, state: Option<LeadState>) -> Lead {
        let mut lead = Lead::new(LeadId::random(), self.team_id, self.clock_now());
        lead.lead_state = state;
        self.store.insert_lead(lead.clone()).await;
        lead
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        use crate::ports::Clock;
        self.clock.now()
    }
}
