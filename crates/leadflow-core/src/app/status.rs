//! Status - 監視用のタイマー集計

use serde::Serialize;

use crate::app::LeadMachine;
use crate::domain::LeadError;

/// `overdue` is the subset of `pending` whose trigger time has passed,
/// i.e. work the sweeper has not caught up with yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimerStats {
    pub pending: usize,
    pub overdue: usize,
}

impl LeadMachine {
    pub async fn timer_stats(&self) -> Result<TimerStats, LeadError> {
        let now = self.now();
        let pending = self.timers.list_pending().await?;
        Ok(TimerStats {
            overdue: pending.iter().filter(|t| t.is_due(now)).count(),
            pending: pending.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::Harness;
    use crate::app::{TimerSweeper, TransitionRequest};
    use crate::domain::LeadState;
    use chrono::Duration;

    #[tokio::test]
    async fn stats_track_pending_and_overdue() {
        let h = Harness::new();
        assert_eq!(h.machine.timer_stats().await.unwrap(), TimerStats::default());

        for _ in 0..2 {
            let lead = h.lead(None).await;
            h.machine
                .transition(TransitionRequest::new(lead.id, lead.team_id, LeadState::Touched))
                .await
                .unwrap();
        }
        assert_eq!(
            h.machine.timer_stats().await.unwrap(),
            TimerStats { pending: 4, overdue: 0 }
        );

        h.clock.advance(Duration::days(8));
        assert_eq!(
            h.machine.timer_stats().await.unwrap(),
            TimerStats { pending: 4, overdue: 2 }
        );

        TimerSweeper::new(h.machine.clone()).run_once().await.unwrap();
        assert_eq!(
            h.machine.timer_stats().await.unwrap(),
            TimerStats { pending: 2, overdue: 0 }
        );
    }
}
