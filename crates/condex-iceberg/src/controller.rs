//! Per-order disclosure state machine.
//!
//! The settlement engine consults `fillable_amount`/`current_chunk`
//! before permitting a fill and reports completed fills through
//! `record_fill`. Advancing to the next chunk is permissionless: it
//! only exposes more of an already-committed total.

use chrono::{DateTime, Utc};
use condex_core::{AccountId, Amount, OrderEvent, OrderFingerprint, SharedRecordStore};
use dashmap::DashMap;
use tracing::{debug, info};

use crate::error::{IcebergError, IcebergResult};
use crate::strategy::RevealStrategy;

/// Disclosure configuration supplied by the order owner.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IcebergParams {
    /// Chunk sizing strategy.
    pub strategy: RevealStrategy,
    /// Minimum seconds between reveals.
    pub reveal_interval_secs: i64,
}

/// Snapshot of the currently visible chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkView {
    /// Size of the visible chunk.
    pub size: Amount,
    /// Total filled across all chunks.
    pub filled: Amount,
    /// Total still unfilled.
    pub remaining: Amount,
    /// Whether the next reveal is due.
    pub ready: bool,
}

#[derive(Debug, Clone)]
struct DisclosureState {
    owner: AccountId,
    total: Amount,
    filled: Amount,
    strategy: RevealStrategy,
    reveal_interval_secs: i64,
    chunk_size: Amount,
    chunk_filled: Amount,
    adaptive_bps: u32,
    started_at: DateTime<Utc>,
    last_reveal_at: DateTime<Utc>,
    last_fill_at: Option<DateTime<Utc>>,
    completed: bool,
}

impl DisclosureState {
    fn remaining(&self) -> Amount {
        self.total.saturating_sub(self.filled)
    }

    fn chunk_visible(&self) -> Amount {
        if self.completed {
            Amount::ZERO
        } else {
            self.chunk_size.saturating_sub(self.chunk_filled)
        }
    }

    fn ready(&self, now: DateTime<Utc>) -> bool {
        !self.completed
            && self.chunk_filled >= self.chunk_size
            && (now - self.last_reveal_at).num_seconds() >= self.reveal_interval_secs
    }

    fn next_chunk(&self, now: DateTime<Utc>) -> Amount {
        let remaining = self.remaining();
        let elapsed = (now - self.started_at).num_seconds();
        let computed = self
            .strategy
            .chunk_size(remaining, self.adaptive_bps, elapsed);
        // Final chunk clamps to the remainder; a rounded-to-zero chunk
        // degrades to the full remainder so the order can terminate.
        if computed.is_zero() {
            remaining
        } else {
            computed.min(remaining)
        }
    }
}

/// Iceberg disclosure controller. One active state per fingerprint.
pub struct DisclosureController {
    engine_account: AccountId,
    entries: DashMap<OrderFingerprint, DisclosureState>,
    records: SharedRecordStore,
}

impl DisclosureController {
    #[must_use]
    pub fn new(engine_account: AccountId, records: SharedRecordStore) -> Self {
        Self {
            engine_account,
            entries: DashMap::new(),
            records,
        }
    }

    /// Configure (or overwrite, owner-only) disclosure for an order.
    /// The first chunk is revealed immediately.
    pub fn configure(
        &self,
        caller: AccountId,
        fingerprint: OrderFingerprint,
        total: Amount,
        params: IcebergParams,
        now: DateTime<Utc>,
    ) -> IcebergResult<()> {
        if !total.is_positive() {
            return Err(IcebergError::Configuration(
                "total amount must be positive".into(),
            ));
        }
        if params.reveal_interval_secs < 0 {
            return Err(IcebergError::Configuration(
                "reveal interval must be non-negative".into(),
            ));
        }
        params.strategy.validate()?;

        if let Some(existing) = self.entries.get(&fingerprint) {
            if existing.owner != caller {
                return Err(IcebergError::Unauthorized(format!(
                    "{caller} is not the owner of {fingerprint}"
                )));
            }
            if existing.completed {
                return Err(IcebergError::Configuration(
                    "disclosure already completed".into(),
                ));
            }
        }

        let adaptive_bps = match &params.strategy {
            RevealStrategy::Adaptive { initial_bps, .. } => *initial_bps,
            _ => 0,
        };
        let mut state = DisclosureState {
            owner: caller,
            total,
            filled: Amount::ZERO,
            strategy: params.strategy,
            reveal_interval_secs: params.reveal_interval_secs,
            chunk_size: Amount::ZERO,
            chunk_filled: Amount::ZERO,
            adaptive_bps,
            started_at: now,
            last_reveal_at: now,
            last_fill_at: None,
            completed: false,
        };
        state.chunk_size = state.next_chunk(now);
        let first_chunk = state.chunk_size;
        let remaining = state.remaining();
        self.entries.insert(fingerprint, state);

        info!(%fingerprint, owner = %caller, %total, %first_chunk, "disclosure configured");
        self.records.append(OrderEvent::DisclosureConfigured {
            fingerprint,
            owner: caller,
            total,
            at: now,
        });
        self.records.append(OrderEvent::ChunkRevealed {
            fingerprint,
            chunk: first_chunk,
            remaining,
            at: now,
        });
        Ok(())
    }

    /// Remove a disclosure state. Owner only.
    pub fn remove(&self, caller: AccountId, fingerprint: OrderFingerprint) -> IcebergResult<()> {
        let Some(state) = self.entries.get(&fingerprint) else {
            return Err(IcebergError::Configuration(format!(
                "no disclosure configured for {fingerprint}"
            )));
        };
        if state.owner != caller {
            return Err(IcebergError::Unauthorized(format!(
                "{caller} is not the owner of {fingerprint}"
            )));
        }
        drop(state);
        self.entries.remove(&fingerprint);
        Ok(())
    }

    /// Snapshot of the current chunk.
    pub fn current_chunk(
        &self,
        fingerprint: OrderFingerprint,
        now: DateTime<Utc>,
    ) -> IcebergResult<ChunkView> {
        let state = self.get(fingerprint)?;
        Ok(ChunkView {
            size: state.chunk_size,
            filled: state.filled,
            remaining: state.remaining(),
            ready: state.ready(now),
        })
    }

    /// Unfilled part of the visible chunk: what the settlement engine
    /// may fill right now. Zero for completed or unknown orders.
    #[must_use]
    pub fn fillable_amount(&self, fingerprint: OrderFingerprint) -> Amount {
        self.entries
            .get(&fingerprint)
            .map(|s| s.chunk_visible())
            .unwrap_or(Amount::ZERO)
    }

    /// Record a completed fill against the visible chunk. Engine only.
    pub fn record_fill(
        &self,
        caller: AccountId,
        fingerprint: OrderFingerprint,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> IcebergResult<()> {
        if caller != self.engine_account {
            return Err(IcebergError::Unauthorized(format!(
                "{caller} is not the settlement engine"
            )));
        }
        if !amount.is_positive() {
            return Err(IcebergError::Configuration(
                "fill amount must be positive".into(),
            ));
        }

        let mut state = self.entries.get_mut(&fingerprint).ok_or_else(|| {
            IcebergError::Configuration(format!("no disclosure configured for {fingerprint}"))
        })?;
        if state.completed {
            return Err(IcebergError::Configuration(
                "disclosure already completed".into(),
            ));
        }
        let visible = state.chunk_visible();
        if amount > visible {
            return Err(IcebergError::ChunkOverfill {
                amount: amount.to_string(),
                visible: visible.to_string(),
            });
        }

        state.chunk_filled = state.chunk_filled + amount;
        state.filled = state.filled + amount;
        state.last_fill_at = Some(now);

        // Chunk complete: feed its fill duration back into the adaptive
        // level before the next reveal computes a size.
        if state.chunk_filled >= state.chunk_size {
            let fill_secs = (now - state.last_reveal_at).num_seconds();
            state.adaptive_bps = state.strategy.adjust_adaptive(state.adaptive_bps, fill_secs);
        }

        let filled_total = state.filled;
        let completed = state.filled >= state.total;
        state.completed = completed;
        let total = state.total;
        drop(state);

        debug!(%fingerprint, %amount, %filled_total, completed, "fill recorded");
        self.records.append(OrderEvent::FillRecorded {
            fingerprint,
            amount,
            filled_total,
            at: now,
        });
        if completed {
            info!(%fingerprint, %total, "disclosure completed");
            self.records.append(OrderEvent::DisclosureCompleted {
                fingerprint,
                total,
                at: now,
            });
        }
        Ok(())
    }

    /// Advance to the next chunk once the current one is filled and the
    /// reveal interval has elapsed. Permissionless; `Ok(false)` when not
    /// ready or already completed (keepers racing each other see a
    /// no-op, never an error).
    pub fn reveal_next(
        &self,
        fingerprint: OrderFingerprint,
        now: DateTime<Utc>,
    ) -> IcebergResult<bool> {
        let mut state = self.entries.get_mut(&fingerprint).ok_or_else(|| {
            IcebergError::Configuration(format!("no disclosure configured for {fingerprint}"))
        })?;
        if state.completed || !state.ready(now) {
            return Ok(false);
        }

        let chunk = state.next_chunk(now);
        state.chunk_size = chunk;
        state.chunk_filled = Amount::ZERO;
        state.last_reveal_at = now;
        let remaining = state.remaining();
        drop(state);

        info!(%fingerprint, %chunk, %remaining, "next chunk revealed");
        self.records.append(OrderEvent::ChunkRevealed {
            fingerprint,
            chunk,
            remaining,
            at: now,
        });
        Ok(true)
    }

    /// Whether the order's full total has been filled.
    #[must_use]
    pub fn is_completed(&self, fingerprint: OrderFingerprint) -> bool {
        self.entries
            .get(&fingerprint)
            .map(|s| s.completed)
            .unwrap_or(false)
    }

    /// Fingerprints whose next reveal is due, for keeper discovery.
    #[must_use]
    pub fn ready_reveals(&self, now: DateTime<Utc>) -> Vec<OrderFingerprint> {
        self.entries
            .iter()
            .filter(|entry| entry.ready(now))
            .map(|entry| *entry.key())
            .collect()
    }

    fn get(&self, fingerprint: OrderFingerprint) -> IcebergResult<DisclosureState> {
        self.entries
            .get(&fingerprint)
            .map(|s| s.clone())
            .ok_or_else(|| {
                IcebergError::Configuration(format!("no disclosure configured for {fingerprint}"))
            })
    }
}
