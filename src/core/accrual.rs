//! Interest accrual scheduling
//!
//! One scheduler drives all interest-bearing accounts instead of one timer
//! per account object, so the task count stays flat as accounts grow. Two
//! periodic tasks run on the tokio runtime:
//!
//! - the **accrual task**, every `InterestCalculationIntervalSeconds`,
//!   iterating every interest-bearing account and dispatching its accrual;
//! - the **cap reset task**, every interval/30 (one simulated day), zeroing
//!   the child daily-spend counters.
//!
//! Tick failures are handled inside [`Bank::run_accrual_tick`]; the tasks
//! themselves never die until the shutdown handle is used. Accounts compete
//! with foreground transfers for the engine's mutation lock, so a tick and a
//! transfer on the same account serialize instead of losing updates.

use crate::core::bank::Bank;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

/// Spawns and owns the periodic accrual tasks
pub struct AccrualScheduler;

impl AccrualScheduler {
    /// Start the accrual and cap-reset tasks for a bank
    ///
    /// Periods are read from the configuration once at spawn; reload the
    /// configuration and respawn to pick up a new interval.
    pub fn spawn(bank: Arc<Bank>) -> SchedulerHandle {
        let config = bank.config();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let accrual = tokio::spawn(Self::run_periodic(
            bank.clone(),
            config.accrual_interval(),
            shutdown_rx.clone(),
            Bank::run_accrual_tick,
        ));
        let cap_reset = tokio::spawn(Self::run_periodic(
            bank,
            config.cap_reset_interval(),
            shutdown_rx,
            Bank::reset_daily_caps,
        ));

        info!(
            accrual_interval = ?config.accrual_interval(),
            cap_reset_interval = ?config.cap_reset_interval(),
            "accrual scheduler started"
        );
        SchedulerHandle {
            shutdown: shutdown_tx,
            tasks: vec![accrual, cap_reset],
        }
    }

    async fn run_periodic(
        bank: Arc<Bank>,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
        tick: fn(&Bank),
    ) {
        // interval() panics on a zero period; the sanitized configuration
        // never produces one, but a hand-built config might
        let period = period.max(Duration::from_millis(1));
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => tick(&bank),
                _ = shutdown.changed() => break,
            }
        }
    }
}

/// Handle over the running scheduler tasks
///
/// The background tasks have no per-tick cancellation; they run until this
/// handle shuts them down, which the process does on exit.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop both tasks and wait for them to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
        info!("accrual scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{BankConfig, ConfigProvider};
    use crate::store::MemoryLedger;
    use crate::types::{AccountKind, UserRole};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn bank_with_clock() -> (Arc<Bank>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let bank = Bank::new(
            Arc::new(MemoryLedger::new()),
            Arc::new(ConfigProvider::fixed(BankConfig::default())),
            clock.clone(),
        )
        .unwrap();
        bank.register_user(1, "Alice", UserRole::Client, false)
            .unwrap();
        (Arc::new(bank), clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_posts_interest_on_its_interval() {
        let (bank, clock) = bank_with_clock();
        let saving = bank.open_account(1, AccountKind::Saving, None).unwrap();

        let handle = AccrualScheduler::spawn(bank.clone());

        // Walk the wall clock alongside the virtual timer so the accrual
        // window matches the interval
        clock.advance(chrono::Duration::seconds(30));
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(bank.balance(saving.id).unwrap(), Decimal::new(10025, 1));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_resets_daily_caps() {
        let (bank, _clock) = bank_with_clock();
        let child = bank.open_account(1, AccountKind::ChildSaving, None).unwrap();
        let sink = bank.open_account(1, AccountKind::Debit, None).unwrap();

        bank.transfer(child.id, sink.id, Decimal::new(200, 0)).unwrap();
        assert!(bank.transfer(child.id, sink.id, Decimal::ONE).is_err());

        let handle = AccrualScheduler::spawn(bank.clone());

        // One simulated day is interval/30 = 1s; after it passes the child
        // may spend again
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(bank.transfer(child.id, sink.id, Decimal::ONE).is_ok());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_ticking() {
        let (bank, clock) = bank_with_clock();
        let saving = bank.open_account(1, AccountKind::Saving, None).unwrap();

        let handle = AccrualScheduler::spawn(bank.clone());
        handle.shutdown().await;

        clock.advance(chrono::Duration::seconds(60));
        tokio::time::sleep(Duration::from_secs(61)).await;

        // No tick fired after shutdown
        assert_eq!(bank.balance(saving.id).unwrap(), Decimal::new(1000, 0));
        assert!(bank.history(saving.id).unwrap().is_empty());
    }
}
