//! Pair coordinator: fill detection and delayed sibling cancellation.
//!
//! The settlement engine notifies the coordinator synchronously after a
//! fill; cancellation happens asynchronously, driven by keepers once the
//! delay elapses. Every entrypoint on a resolved link is a no-op so
//! keepers racing each other never cascade failures.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use condex_core::{
    AccountId, Amount, OrderEvent, OrderFingerprint, SettlementEngine, SharedRecordStore,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{OcoError, OcoResult};
use crate::link::{LinkState, PairLink, PairStrategy, ResolvedOutcome};

/// Coordinator configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CoordinatorConfig {
    /// Ceiling on the fee of a cancellation transaction. Discourages
    /// priority-fee races over cancellation ordering. `None` disables
    /// the check.
    pub max_cancel_fee: Option<Amount>,
}

/// Outcome of a cancellation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The unfilled sibling was cancelled; link resolved.
    Cancelled(OrderFingerprint),
    /// The link was already resolved; nothing to do.
    AlreadyResolved,
}

/// One-cancels-other coordinator.
///
/// Links are stored once and indexed under both fingerprints; the
/// settlement engine is the source of truth for order ownership.
pub struct PairCoordinator<S: SettlementEngine> {
    engine: Arc<S>,
    engine_account: AccountId,
    config: CoordinatorConfig,
    links: DashMap<OrderFingerprint, Arc<Mutex<PairLink>>>,
    records: SharedRecordStore,
}

impl<S: SettlementEngine> PairCoordinator<S> {
    #[must_use]
    pub fn new(
        engine: Arc<S>,
        engine_account: AccountId,
        config: CoordinatorConfig,
        records: SharedRecordStore,
    ) -> Self {
        Self {
            engine,
            engine_account,
            config,
            links: DashMap::new(),
            records,
        }
    }

    /// Link two orders one-cancels-other. The caller must own both per
    /// the settlement engine, and neither may already be linked.
    pub fn link(
        &self,
        caller: AccountId,
        a: OrderFingerprint,
        b: OrderFingerprint,
        strategy: PairStrategy,
        cancellation_delay_secs: i64,
        now: DateTime<Utc>,
    ) -> OcoResult<()> {
        if a == b {
            return Err(OcoError::Configuration(
                "cannot link an order to itself".into(),
            ));
        }
        if cancellation_delay_secs < 0 {
            return Err(OcoError::Configuration(
                "cancellation delay must be non-negative".into(),
            ));
        }
        for fingerprint in [a, b] {
            match self.engine.owner_of(fingerprint) {
                Some(owner) if owner == caller => {}
                Some(_) => {
                    return Err(OcoError::Unauthorized(format!(
                        "{caller} does not own {fingerprint}"
                    )))
                }
                None => {
                    return Err(OcoError::Configuration(format!(
                        "unknown order {fingerprint}"
                    )))
                }
            }
            if self.links.contains_key(&fingerprint) {
                return Err(OcoError::Configuration(format!(
                    "{fingerprint} is already linked"
                )));
            }
        }

        let link = Arc::new(Mutex::new(PairLink::new(
            a,
            b,
            caller,
            strategy,
            cancellation_delay_secs,
        )));
        self.links.insert(a, Arc::clone(&link));
        self.links.insert(b, link);

        info!(%a, %b, owner = %caller, cancellation_delay_secs, "orders linked");
        self.records.append(OrderEvent::PairLinked {
            a,
            b,
            owner: caller,
            at: now,
        });
        Ok(())
    }

    /// Remove an `Active` link. Owner only; once a fill has been
    /// detected the pair must run to resolution.
    pub fn unlink(&self, caller: AccountId, fingerprint: OrderFingerprint) -> OcoResult<()> {
        let link = self.get(fingerprint)?;
        let (a, b) = {
            let guard = link.lock();
            if guard.owner != caller {
                return Err(OcoError::Unauthorized(format!(
                    "{caller} is not the owner of this link"
                )));
            }
            if guard.state != LinkState::Active {
                return Err(OcoError::RaceCondition(
                    "a fill has been detected; the link must resolve".into(),
                ));
            }
            (guard.a, guard.b)
        };
        self.links.remove(&a);
        self.links.remove(&b);
        Ok(())
    }

    /// Notification from the settlement engine that one side filled.
    ///
    /// Active links go pending; a sibling fill while pending resolves
    /// the link as a benign both-filled race; resolved links no-op.
    pub fn on_fill_detected(
        &self,
        caller: AccountId,
        fingerprint: OrderFingerprint,
        now: DateTime<Utc>,
    ) -> OcoResult<()> {
        if caller != self.engine_account {
            return Err(OcoError::Unauthorized(format!(
                "{caller} is not the settlement engine"
            )));
        }
        let link = self.get(fingerprint)?;

        enum Transition {
            Pending,
            BothFilled,
            Ignored,
        }

        // State decided under the lock; logging and record appends run
        // after it is released.
        let transition = {
            let mut guard = link.lock();
            match guard.state {
                LinkState::Active => {
                    guard.state = LinkState::PendingCancel {
                        filled: fingerprint,
                        detected_at: now,
                    };
                    Transition::Pending
                }
                LinkState::PendingCancel { filled, .. } if filled != fingerprint => {
                    // The in-flight sibling fill landed before
                    // cancellation: both legs executed, accepted as a
                    // benign outcome.
                    guard.state = LinkState::Resolved {
                        outcome: ResolvedOutcome::BothFilled,
                    };
                    Transition::BothFilled
                }
                // Duplicate notification, cancellation in flight, or
                // already resolved: idempotent.
                LinkState::PendingCancel { .. }
                | LinkState::Resolving { .. }
                | LinkState::Resolved { .. } => Transition::Ignored,
            }
        };

        match transition {
            Transition::Pending => {
                info!(%fingerprint, "fill detected, sibling pending cancellation");
                self.records.append(OrderEvent::PairFillDetected {
                    fingerprint,
                    at: now,
                });
            }
            Transition::BothFilled => {
                info!(%fingerprint, "both sides filled inside the delay window");
                self.records.append(OrderEvent::PairResolved {
                    fingerprint,
                    both_filled: true,
                    at: now,
                });
            }
            Transition::Ignored => {
                debug!(%fingerprint, "fill notification ignored");
            }
        }
        Ok(())
    }

    /// Keeper entrypoint: cancel the unfilled sibling once the delay has
    /// elapsed.
    pub fn process_cancellation(
        &self,
        fingerprint: OrderFingerprint,
        tx_fee: Option<Amount>,
        now: DateTime<Utc>,
    ) -> OcoResult<CancelOutcome> {
        if let (Some(ceiling), Some(fee)) = (self.config.max_cancel_fee, tx_fee) {
            if fee > ceiling {
                return Err(OcoError::FeeTooHigh {
                    fee: fee.to_string(),
                    ceiling: ceiling.to_string(),
                });
            }
        }

        let link = self.get(fingerprint)?;

        // Claim the link by flipping it to `Resolving` under the lock,
        // then release it: the engine's cancel path may synchronously
        // call back into this coordinator.
        let (filled, sibling) = {
            let mut guard = link.lock();
            let (filled, detected_at) = match guard.state {
                LinkState::Resolved { .. } => return Ok(CancelOutcome::AlreadyResolved),
                LinkState::Resolving { .. } => {
                    return Err(OcoError::RaceCondition(
                        "cancellation already in flight".into(),
                    ))
                }
                LinkState::Active => {
                    return Err(OcoError::RaceCondition(
                        "no fill detected for this link yet".into(),
                    ))
                }
                LinkState::PendingCancel {
                    filled,
                    detected_at,
                } => (filled, detected_at),
            };

            let elapsed = (now - detected_at).num_seconds();
            if elapsed < guard.cancellation_delay_secs {
                return Err(OcoError::RaceCondition(format!(
                    "cancellation due in {}s",
                    guard.cancellation_delay_secs - elapsed
                )));
            }

            guard.state = LinkState::Resolving {
                filled,
                detected_at,
            };
            (filled, guard.sibling_of(filled))
        };

        if let Err(err) = self.engine.cancel(sibling) {
            warn!(%sibling, %err, "settlement cancel failed, link stays pending");
            let mut guard = link.lock();
            if let LinkState::Resolving {
                filled,
                detected_at,
            } = guard.state
            {
                guard.state = LinkState::PendingCancel {
                    filled,
                    detected_at,
                };
            }
            return Err(err.into());
        }

        link.lock().state = LinkState::Resolved {
            outcome: ResolvedOutcome::Cancelled { cancelled: sibling },
        };

        info!(filled = %filled, cancelled = %sibling, "sibling cancelled, link resolved");
        self.records.append(OrderEvent::SiblingCancelled {
            filled,
            cancelled: sibling,
            at: now,
        });
        self.records.append(OrderEvent::PairResolved {
            fingerprint,
            both_filled: false,
            at: now,
        });
        Ok(CancelOutcome::Cancelled(sibling))
    }

    /// Current state of the link containing `fingerprint`.
    #[must_use]
    pub fn state_of(&self, fingerprint: OrderFingerprint) -> Option<LinkState> {
        self.links.get(&fingerprint).map(|l| l.lock().state)
    }

    /// Fingerprints whose cancellation is due, for keeper discovery.
    /// One entry per link (the filled side), not per fingerprint.
    #[must_use]
    pub fn due_cancellations(&self, now: DateTime<Utc>) -> Vec<OrderFingerprint> {
        let mut due = Vec::new();
        for entry in self.links.iter() {
            let guard = entry.value().lock();
            if let LinkState::PendingCancel { filled, .. } = guard.state {
                // Deduplicate: each link appears under both keys
                if *entry.key() == filled && guard.is_due(now) {
                    due.push(filled);
                }
            }
        }
        due
    }

    fn get(&self, fingerprint: OrderFingerprint) -> OcoResult<Arc<Mutex<PairLink>>> {
        self.links
            .get(&fingerprint)
            .map(|l| Arc::clone(&l))
            .ok_or_else(|| OcoError::Configuration(format!("{fingerprint} is not linked")))
    }
}
