//! Polling loop driving the scheduler.
//!
//! Each tick scans for due work and, when there is any, performs it as
//! the configured keeper identity. Shutdown is signalled through a
//! watch channel so the loop drains its current tick before exiting.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use condex_core::{AccountId, PriceFeed, SettlementEngine};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::scheduler::{KeeperScheduler, WorkReport};

/// Periodic keeper driver.
pub struct KeeperLoop<F: PriceFeed, S: SettlementEngine> {
    scheduler: Arc<KeeperScheduler<F, S>>,
    /// Identity the loop performs work as.
    keeper: AccountId,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<F: PriceFeed, S: SettlementEngine> KeeperLoop<F, S> {
    #[must_use]
    pub fn new(
        scheduler: Arc<KeeperScheduler<F, S>>,
        keeper: AccountId,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            scheduler,
            keeper,
            interval,
            shutdown,
        }
    }

    /// Poll interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Scan and perform one round of due work.
    ///
    /// Returns `None` when no work was due. Failures are logged and
    /// retried on a later tick.
    pub fn tick(&self) -> Option<WorkReport> {
        let now = Utc::now();
        let batch = self.scheduler.check_work(now);
        if batch.is_empty() {
            return None;
        }

        let payload = match batch.encode() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%err, "failed to encode work batch");
                return None;
            }
        };
        match self.scheduler.perform_work(self.keeper, &payload, now) {
            Ok(report) => {
                debug!(
                    performed = report.performed,
                    skipped = report.skipped,
                    "tick complete"
                );
                Some(report)
            }
            Err(err) => {
                warn!(%err, "work dispatch failed");
                None
            }
        }
    }

    /// Run until the shutdown channel flips to `true`.
    pub async fn run(mut self) {
        info!(keeper = %self.keeper, interval_ms = self.interval.as_millis() as u64, "keeper loop started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(keeper = %self.keeper, "keeper loop stopped");
    }
}
