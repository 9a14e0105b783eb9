//! Work discovery and bounded dispatch.
//!
//! `check_work` scans the three engines (the trigger scan also records
//! price samples, so polling is what feeds smoothing); the resulting
//! batch is an opaque payload a keeper hands back to `perform_work`. Transient per-action failures (stale feeds, not yet
//! due, raced by another keeper) are counted as skipped and retried on
//! a later poll, never surfaced as batch failure.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use condex_core::{
    AccountId, OrderEvent, OrderFingerprint, PriceFeed, SettlementEngine, SharedRecordStore,
};
use condex_iceberg::DisclosureController;
use condex_oco::{CancelOutcome, PairCoordinator};
use condex_trigger::TriggerEvaluator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{KeeperError, KeeperResult};
use crate::registry::KeeperRegistry;

/// One dispatchable unit of keeper work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum KeeperAction {
    /// Submit a triggered order to the settlement engine's fill path.
    ExecuteTrigger { fingerprint: OrderFingerprint },
    /// Advance an iceberg order to its next chunk.
    RevealChunk { fingerprint: OrderFingerprint },
    /// Cancel the unfilled sibling of a filled pair.
    ProcessCancellation { fingerprint: OrderFingerprint },
}

/// A batch of pending actions, encodable to an opaque payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkBatch {
    pub actions: Vec<KeeperAction>,
}

impl WorkBatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Opaque wire encoding consumed by `perform_work`.
    pub fn encode(&self) -> KeeperResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a payload produced by `encode`.
    pub fn decode(payload: &[u8]) -> KeeperResult<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Result of one `perform_work` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkReport {
    /// Actions that completed and accrued a reward.
    pub performed: usize,
    /// Actions skipped as transient no-ops (retry later).
    pub skipped: usize,
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Cap on actions processed per `perform_work` call, keeping
    /// per-call cost predictable.
    pub max_actions_per_call: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_actions_per_call: 16,
        }
    }
}

/// Aggregates due work across the trigger, disclosure and pair engines.
pub struct KeeperScheduler<F: PriceFeed, S: SettlementEngine> {
    trigger: Arc<TriggerEvaluator<F>>,
    iceberg: Arc<DisclosureController>,
    oco: Arc<PairCoordinator<S>>,
    engine: Arc<S>,
    registry: Arc<KeeperRegistry>,
    config: SchedulerConfig,
    records: SharedRecordStore,
}

impl<F: PriceFeed, S: SettlementEngine> KeeperScheduler<F, S> {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trigger: Arc<TriggerEvaluator<F>>,
        iceberg: Arc<DisclosureController>,
        oco: Arc<PairCoordinator<S>>,
        engine: Arc<S>,
        registry: Arc<KeeperRegistry>,
        config: SchedulerConfig,
        records: SharedRecordStore,
    ) -> Self {
        Self {
            trigger,
            iceberg,
            oco,
            engine,
            registry,
            config,
            records,
        }
    }

    /// Scan for due work across all three engines. The trigger scan
    /// records each candidate's observed price as a sample.
    #[must_use]
    pub fn check_work(&self, now: DateTime<Utc>) -> WorkBatch {
        let mut actions = Vec::new();
        for (fingerprint, _price) in self.trigger.triggered_unexecuted(now) {
            actions.push(KeeperAction::ExecuteTrigger { fingerprint });
        }
        for fingerprint in self.iceberg.ready_reveals(now) {
            actions.push(KeeperAction::RevealChunk { fingerprint });
        }
        for fingerprint in self.oco.due_cancellations(now) {
            actions.push(KeeperAction::ProcessCancellation { fingerprint });
        }
        debug!(pending = actions.len(), "work scan complete");
        WorkBatch { actions }
    }

    /// Dispatch a batch of actions on behalf of `caller`.
    ///
    /// Bounded to `max_actions_per_call`; rewards accrue per performed
    /// action.
    pub fn perform_work(
        &self,
        caller: AccountId,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> KeeperResult<WorkReport> {
        if !self.registry.is_authorized(caller) {
            return Err(KeeperError::Unauthorized(format!(
                "{caller} is not an authorized keeper"
            )));
        }
        let batch = WorkBatch::decode(payload)?;

        let mut report = WorkReport::default();
        for action in batch.actions.iter().take(self.config.max_actions_per_call) {
            if self.dispatch(*action, now) {
                report.performed += 1;
            } else {
                report.skipped += 1;
            }
        }

        self.registry.accrue(caller, report.performed);
        info!(
            keeper = %caller,
            performed = report.performed,
            skipped = report.skipped,
            "work batch processed"
        );
        self.records.append(OrderEvent::WorkPerformed {
            keeper: caller,
            performed: report.performed,
            skipped: report.skipped,
            at: now,
        });
        Ok(report)
    }

    /// Returns true if the action completed, false for a transient skip.
    fn dispatch(&self, action: KeeperAction, now: DateTime<Utc>) -> bool {
        match action {
            KeeperAction::ExecuteTrigger { fingerprint } => {
                match self.engine.submit_fill(fingerprint) {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(%fingerprint, %err, "triggered fill submission skipped");
                        false
                    }
                }
            }
            KeeperAction::RevealChunk { fingerprint } => {
                match self.iceberg.reveal_next(fingerprint, now) {
                    Ok(advanced) => advanced,
                    Err(err) => {
                        warn!(%fingerprint, %err, "reveal skipped");
                        false
                    }
                }
            }
            KeeperAction::ProcessCancellation { fingerprint } => {
                match self.oco.process_cancellation(fingerprint, None, now) {
                    Ok(CancelOutcome::Cancelled(_)) => true,
                    // Lost the race to another keeper: benign
                    Ok(CancelOutcome::AlreadyResolved) => false,
                    Err(err) => {
                        debug!(%fingerprint, %err, "cancellation skipped");
                        false
                    }
                }
            }
        }
    }
}
