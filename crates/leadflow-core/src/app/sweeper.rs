//! TimerSweeper - 期限到来タイマーの実行
//!
//! # フロー（run_once 1 回分）
//! 1. `trigger_at <= now` の pending タイマーを古い順に最大 `sweep_batch_size` 件取得
//! 2. 種類ごとに executor を呼ぶ
//! 3. 成功: executed_at を付け attempts += 1
//! 4. 失敗: attempts += 1, last_error を記録。上限に達したらキャンセル
//!
//! 常駐ループは持たない。外部の cron から run_once を呼ぶ想定。

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::app::LeadMachine;
use crate::domain::{LeadError, LeadTimer, StoreError, TimerType};

pub const MAX_ATTEMPTS_REASON: &str = "Max attempts reached";

/// One sweep's tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub executed: usize,
    pub failed: usize,
    /// Failures that used up the last attempt.
    pub cancelled: usize,
}

#[derive(Debug, Clone)]
pub struct TimerSweeper {
    machine: LeadMachine,
}

impl TimerSweeper {
    pub fn new(machine: LeadMachine) -> Self {
        Self { machine }
    }

    /// Run every due timer once.
    ///
    /// Each timer is settled on its own: neither an executor error nor a
    /// store error on one timer stops the rest of the batch. Only a failure
    /// to load the batch itself is returned.
    pub async fn run_once(&self) -> Result<SweepReport, LeadError> {
        let m = &self.machine;
        let now = m.now();
        let due = m.timers.due(now, m.config.sweep_batch_size).await?;
        let mut report = SweepReport::default();
        if due.is_empty() {
            return Ok(report);
        }

        info!(count = due.len(), "executing due lead timers");

        for timer in due {
            let result = self.execute(&timer).await;
            if let Err(e) = self.settle(&timer, result, now, &mut report).await {
                report.failed += 1;
                error!(
                    timer_id = %timer.id,
                    lead_id = %timer.lead_id,
                    error = %e,
                    "could not record timer outcome"
                );
            }
        }

        Ok(report)
    }

    /// Write the executor's result back to the timer row.
    async fn settle(
        &self,
        timer: &LeadTimer,
        result: Result<(), LeadError>,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> Result<(), StoreError> {
        let timers = &self.machine.timers;
        match result {
            Ok(()) => {
                timers.mark_executed(timer.id, now).await?;
                report.executed += 1;
                info!(
                    timer_id = %timer.id,
                    timer_type = %timer.timer_type,
                    lead_id = %timer.lead_id,
                    "timer executed"
                );
            }
            Err(e) => {
                let message = e.to_string();
                error!(timer_id = %timer.id, error = %message, "timer failed");

                let updated = timers.record_failure(timer.id, &message, now).await?;
                report.failed += 1;
                if updated.attempts_exhausted() {
                    timers.cancel(timer.id, MAX_ATTEMPTS_REASON, now).await?;
                    report.cancelled += 1;
                    warn!(
                        timer_id = %timer.id,
                        attempts = updated.attempts,
                        "timer cancelled after repeated failures"
                    );
                }
            }
        }
        Ok(())
    }

    async fn execute(&self, timer: &LeadTimer) -> Result<(), LeadError> {
        match timer.timer_type {
            TimerType::Timer7d => {
                self.machine.move_to_retargeting(timer.lead_id).await?;
            }
            TimerType::Timer14d => {
                self.machine.rotate_template(timer.lead_id).await?;
            }
            TimerType::FollowUp => {
                info!(lead_id = %timer.lead_id, "follow-up timer triggered");
            }
            TimerType::Callback => {
                info!(lead_id = %timer.lead_id, "callback timer triggered");
            }
            TimerType::Timer30d => {
                warn!(lead_id = %timer.lead_id, timer_type = %timer.timer_type, "no executor for timer type");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{Harness, t0};
    use crate::app::{LeadMachineBuilder, TransitionRequest};
    use crate::config::LeadMachineConfig;
    use crate::domain::{LeadId, LeadState, LeadTimerId, NewLeadTimer, Payload, TeamId};
    use crate::impls::InMemoryLeadStore;
    use crate::ports::{FixedClock, LeadRepository, LeadTimerRepository};
    use async_trait::async_trait;
    use chrono::Duration;

    fn timer(lead_id: LeadId, team_id: TeamId, timer_type: TimerType, at: DateTime<Utc>) -> LeadTimer {
        NewLeadTimer {
            team_id,
            lead_id,
            timer_type,
            trigger_at: at,
            action: "test".into(),
            action_payload: Payload::new(),
            max_attempts: 3,
        }
        .into_timer(LeadTimerId::random(), t0())
    }

    #[tokio::test]
    async fn seven_day_timer_fires_end_to_end() {
        let h = Harness::new();
        let lead = h.lead(None).await;
        h.machine
            .transition(TransitionRequest::new(lead.id, lead.team_id, LeadState::Touched))
            .await
            .unwrap();
        let sweeper = TimerSweeper::new(h.machine.clone());

        assert_eq!(sweeper.run_once().await.unwrap(), SweepReport::default());

        h.clock.advance(Duration::days(7));
        let report = sweeper.run_once().await.unwrap();

        assert_eq!(report.executed, 1);
        let stored = h.store.get(lead.id).await.unwrap().unwrap();
        assert_eq!(stored.lead_state, Some(LeadState::Retargeting));

        let timers = h.machine.timers_for_lead(lead.id).await.unwrap();
        let t7 = timers.iter().find(|t| t.timer_type == TimerType::Timer7d).unwrap();
        assert_eq!(t7.executed_at, Some(t0() + Duration::days(7)));
        assert_eq!(t7.attempts, 1);
        let t14 = timers.iter().find(|t| t.timer_type == TimerType::Timer14d).unwrap();
        assert!(t14.is_pending());

        // executed timers are not picked up again
        assert_eq!(sweeper.run_once().await.unwrap().executed, 0);

        h.clock.advance(Duration::days(7));
        assert_eq!(sweeper.run_once().await.unwrap().executed, 1);
        let events = h.store.all_events().await;
        assert_eq!(events.last().unwrap().event_type, crate::domain::LeadEventType::Timer14d);
    }

    #[tokio::test]
    async fn failing_timer_is_retried_then_cancelled() {
        let h = Harness::new();
        let orphan = LeadId::random();
        h.store
            .insert_ignore_conflict(vec![timer(orphan, h.team_id, TimerType::Timer7d, t0())])
            .await
            .unwrap();
        let sweeper = TimerSweeper::new(h.machine.clone());

        let first = sweeper.run_once().await.unwrap();
        let second = sweeper.run_once().await.unwrap();
        let third = sweeper.run_once().await.unwrap();
        let fourth = sweeper.run_once().await.unwrap();

        assert_eq!(first, SweepReport { executed: 0, failed: 1, cancelled: 0 });
        assert_eq!(second.cancelled, 0);
        assert_eq!(third, SweepReport { executed: 0, failed: 1, cancelled: 1 });
        assert_eq!(fourth, SweepReport::default());

        let timers = h.store.all_timers().await;
        assert_eq!(timers[0].attempts, 3);
        assert_eq!(timers[0].cancel_reason.as_deref(), Some(MAX_ATTEMPTS_REASON));
        assert!(timers[0].last_error.as_deref().unwrap().contains("not found"));
        assert!(timers[0].executed_at.is_none());
    }

    #[tokio::test]
    async fn log_only_timers_are_marked_executed() {
        let h = Harness::new();
        let lead = h.lead(Some(LeadState::Responded)).await;
        h.store
            .insert_ignore_conflict(vec![
                timer(lead.id, lead.team_id, TimerType::FollowUp, t0()),
                timer(lead.id, lead.team_id, TimerType::Callback, t0()),
                timer(lead.id, lead.team_id, TimerType::Timer30d, t0()),
            ])
            .await
            .unwrap();

        let report = TimerSweeper::new(h.machine.clone()).run_once().await.unwrap();

        assert_eq!(report.executed, 3);
        assert!(h.store.all_events().await.is_empty());
        assert!(h.store.all_timers().await.iter().all(|t| !t.is_pending()));
    }

    #[tokio::test]
    async fn batch_size_limits_one_sweep() {
        let h = Harness::with_config(LeadMachineConfig {
            sweep_batch_size: 2,
            ..LeadMachineConfig::default()
        });
        for _ in 0..3 {
            let lead = h.lead(Some(LeadState::Responded)).await;
            h.store
                .insert_ignore_conflict(vec![timer(lead.id, lead.team_id, TimerType::FollowUp, t0())])
                .await
                .unwrap();
        }
        let sweeper = TimerSweeper::new(h.machine.clone());

        assert_eq!(sweeper.run_once().await.unwrap().executed, 2);
        assert_eq!(sweeper.run_once().await.unwrap().executed, 1);
    }

    /// In-memory timers whose `mark_executed` fails for one timer.
    struct StuckTimer {
        inner: InMemoryLeadStore,
        stuck: LeadTimerId,
    }

    #[async_trait]
    impl LeadTimerRepository for StuckTimer {
        async fn insert_ignore_conflict(&self, timers: Vec<LeadTimer>) -> Result<usize, StoreError> {
            self.inner.insert_ignore_conflict(timers).await
        }
        async fn cancel_pending(
            &self,
            lead_id: LeadId,
            reason: &str,
            at: DateTime<Utc>,
        ) -> Result<usize, StoreError> {
            self.inner.cancel_pending(lead_id, reason, at).await
        }
        async fn due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<LeadTimer>, StoreError> {
            self.inner.due(now, limit).await
        }
        async fn mark_executed(&self, id: LeadTimerId, at: DateTime<Utc>) -> Result<LeadTimer, StoreError> {
            if id == self.stuck {
                return Err(StoreError::Backend("write timed out".into()));
            }
            self.inner.mark_executed(id, at).await
        }
        async fn record_failure(
            &self,
            id: LeadTimerId,
            error: &str,
            at: DateTime<Utc>,
        ) -> Result<LeadTimer, StoreError> {
            self.inner.record_failure(id, error, at).await
        }
        async fn cancel(
            &self,
            id: LeadTimerId,
            reason: &str,
            at: DateTime<Utc>,
        ) -> Result<LeadTimer, StoreError> {
            self.inner.cancel(id, reason, at).await
        }
        async fn list_for_lead(&self, lead_id: LeadId) -> Result<Vec<LeadTimer>, StoreError> {
            LeadTimerRepository::list_for_lead(&self.inner, lead_id).await
        }
        async fn list_pending(&self) -> Result<Vec<LeadTimer>, StoreError> {
            self.inner.list_pending().await
        }
    }

    #[tokio::test]
    async fn store_error_on_one_timer_does_not_stop_the_batch() {
        let store = InMemoryLeadStore::new();
        let team_id = TeamId::random();
        let first = timer(LeadId::random(), team_id, TimerType::FollowUp, t0() - Duration::hours(2));
        let second = timer(LeadId::random(), team_id, TimerType::Callback, t0() - Duration::hours(1));
        let third = timer(LeadId::random(), team_id, TimerType::FollowUp, t0());
        store
            .insert_ignore_conflict(vec![first.clone(), second.clone(), third.clone()])
            .await
            .unwrap();

        let machine = LeadMachineBuilder::new()
            .lead_repository(store.clone())
            .event_repository(store.clone())
            .timer_repository(StuckTimer {
                inner: store.clone(),
                stuck: first.id,
            })
            .clock(FixedClock::new(t0()))
            .build()
            .unwrap();

        let report = TimerSweeper::new(machine).run_once().await.unwrap();

        assert_eq!(report, SweepReport { executed: 2, failed: 1, cancelled: 0 });
        let timers = store.all_timers().await;
        let by_id = |id| timers.iter().find(|t| t.id == id).unwrap();
        assert!(by_id(first.id).is_pending());
        assert_eq!(by_id(second.id).executed_at, Some(t0()));
        assert_eq!(by_id(third.id).executed_at, Some(t0()));
    }
}
