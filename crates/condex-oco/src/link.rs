//! Pair link state machine.
//!
//! A link is symmetric by construction: it stores both fingerprints and
//! which one filled, so cancelling A because B filled is the same code
//! path as the reverse. A link resolves at most once.

use chrono::{DateTime, Utc};
use condex_core::{AccountId, OrderFingerprint};
use serde::{Deserialize, Serialize};

/// Why two orders were paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStrategy {
    /// Plain one-cancels-other pair.
    OneCancelsOther,
    /// Take-profit + stop-loss bracket around a position.
    Bracket,
}

/// Terminal outcome of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedOutcome {
    /// The unfilled sibling was cancelled.
    Cancelled { cancelled: OrderFingerprint },
    /// Both legs filled inside the delay window; nothing cancelled.
    BothFilled,
}

/// Lifecycle of a pair link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkState {
    /// Neither side has filled.
    Active,
    /// One side filled; its sibling is awaiting cancellation after the
    /// delay.
    PendingCancel {
        filled: OrderFingerprint,
        detected_at: DateTime<Utc>,
    },
    /// A sibling cancellation is in flight at the settlement engine.
    /// The link lock is not held across that call; this state is the
    /// guard instead.
    Resolving {
        filled: OrderFingerprint,
        detected_at: DateTime<Utc>,
    },
    /// Terminal; any further notification is a no-op.
    Resolved { outcome: ResolvedOutcome },
}

/// One mutually-exclusive order pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairLink {
    pub a: OrderFingerprint,
    pub b: OrderFingerprint,
    pub owner: AccountId,
    pub strategy: PairStrategy,
    /// Seconds between fill detection and forced cancellation. Absorbs
    /// the window in which both sides may be filled by concurrent
    /// settlement attempts.
    pub cancellation_delay_secs: i64,
    pub state: LinkState,
}

impl PairLink {
    #[must_use]
    pub fn new(
        a: OrderFingerprint,
        b: OrderFingerprint,
        owner: AccountId,
        strategy: PairStrategy,
        cancellation_delay_secs: i64,
    ) -> Self {
        Self {
            a,
            b,
            owner,
            strategy,
            cancellation_delay_secs,
            state: LinkState::Active,
        }
    }

    /// The other side of the pair.
    #[must_use]
    pub fn sibling_of(&self, fingerprint: OrderFingerprint) -> OrderFingerprint {
        if fingerprint == self.a {
            self.b
        } else {
            self.a
        }
    }

    /// Whether this link contains the fingerprint.
    #[must_use]
    pub fn contains(&self, fingerprint: OrderFingerprint) -> bool {
        fingerprint == self.a || fingerprint == self.b
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, LinkState::Resolved { .. })
    }

    /// Whether the cancellation delay has elapsed.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            LinkState::PendingCancel { detected_at, .. } => {
                (now - detected_at).num_seconds() >= self.cancellation_delay_secs
            }
            _ => false,
        }
    }
}
