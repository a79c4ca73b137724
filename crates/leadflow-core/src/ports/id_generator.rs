//! IdGenerator port - ID 生成の抽象化
//!
//! イベントとタイマーの ID はこのクレートが採番する。リードとチームの ID は
//! リードストア側のもので、ここでは生成しない。

use ulid::Ulid;

use crate::domain::ids::{LeadEventId, LeadTimerId};
use crate::ports::Clock;

/// IdGenerator は分散環境で衝突しない ID を生成
///
/// ULID なので時刻順にソートでき、イベントログの並びとも一致する。
pub trait IdGenerator: Send + Sync {
    fn generate_event_id(&self) -> LeadEventId;

    fn generate_timer_id(&self) -> LeadTimerId;
}

/// UlidGenerator は Clock の時刻を ULID のタイムスタンプ部に使う
///
/// テストで FixedClock を渡すと時刻部分が決定的になる。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_event_id(&self) -> LeadEventId {
        LeadEventId::from(self.next_ulid())
    }

    fn generate_timer_id(&self) -> LeadTimerId {
        LeadTimerId::from(self.next_ulid())
    }
}
