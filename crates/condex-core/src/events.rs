//! Append-only event records emitted by the conditional engines.
//!
//! Events are consumed by the keeper service and any off-chain
//! indexing/UI layer. This layer only emits them; storage and querying
//! live outside.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::decimal::{Amount, Price};
use crate::identity::{AccountId, OrderFingerprint};

/// One record in the append-only log, keyed by fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderEvent {
    /// A trigger configuration was created or overwritten.
    TriggerConfigured {
        fingerprint: OrderFingerprint,
        owner: AccountId,
        threshold: Price,
        at: DateTime<Utc>,
    },
    /// A trigger configuration was removed by its owner or the admin.
    TriggerRemoved {
        fingerprint: OrderFingerprint,
        by: AccountId,
        at: DateTime<Utc>,
    },
    /// A triggered order executed through the swap venue.
    TriggerExecuted {
        fingerprint: OrderFingerprint,
        executed_price: Price,
        sold: Amount,
        received: Amount,
        at: DateTime<Utc>,
    },
    /// An iceberg order was configured.
    DisclosureConfigured {
        fingerprint: OrderFingerprint,
        owner: AccountId,
        total: Amount,
        at: DateTime<Utc>,
    },
    /// A new chunk became visible.
    ChunkRevealed {
        fingerprint: OrderFingerprint,
        chunk: Amount,
        remaining: Amount,
        at: DateTime<Utc>,
    },
    /// The settlement engine reported a fill against the current chunk.
    FillRecorded {
        fingerprint: OrderFingerprint,
        amount: Amount,
        filled_total: Amount,
        at: DateTime<Utc>,
    },
    /// An iceberg order reached its total.
    DisclosureCompleted {
        fingerprint: OrderFingerprint,
        total: Amount,
        at: DateTime<Utc>,
    },
    /// Two orders were linked one-cancels-other.
    PairLinked {
        a: OrderFingerprint,
        b: OrderFingerprint,
        owner: AccountId,
        at: DateTime<Utc>,
    },
    /// A fill of one side of a pair was detected.
    PairFillDetected {
        fingerprint: OrderFingerprint,
        at: DateTime<Utc>,
    },
    /// The unfilled sibling of a pair was cancelled.
    SiblingCancelled {
        filled: OrderFingerprint,
        cancelled: OrderFingerprint,
        at: DateTime<Utc>,
    },
    /// A pair reached its terminal state.
    PairResolved {
        fingerprint: OrderFingerprint,
        both_filled: bool,
        at: DateTime<Utc>,
    },
    /// A keeper registration changed.
    KeeperRegistered {
        keeper: AccountId,
        authorized: bool,
        at: DateTime<Utc>,
    },
    /// A keeper completed a batch of work.
    WorkPerformed {
        keeper: AccountId,
        performed: usize,
        skipped: usize,
        at: DateTime<Utc>,
    },
}

/// Sink for the append-only event log.
pub trait RecordStore: Send + Sync {
    /// Append one event. Must not fail; durability is the store's problem.
    fn append(&self, event: OrderEvent);
}

/// Shared handle to a record store.
pub type SharedRecordStore = Arc<dyn RecordStore>;

/// In-memory record store for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    events: Mutex<Vec<OrderEvent>>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle, ready to hand to the engines.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Snapshot of all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<OrderEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl RecordStore for MemoryRecordStore {
    fn append(&self, event: OrderEvent) {
        self.events.lock().push(event);
    }
}
