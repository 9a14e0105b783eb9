//! Collaborator traits at the boundaries of the conditional layer.
//!
//! The settlement engine, price feed service and swap venue are external
//! systems; each engine in this workspace talks to them only through these
//! traits so tests can substitute deterministic implementations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Amount, Price};
use crate::error::Result;
use crate::identity::{AccountId, FeedId, OrderFingerprint};

/// Largest decimal count accepted from a price source. Sources report
/// their own decimal count, so it is unvalidated external data; quotes
/// beyond this are rejected rather than scaled.
pub const MAX_FEED_DECIMALS: u32 = 18;

/// Latest observation from a single price source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Raw price as reported by the source (integer mantissa).
    pub raw: Decimal,
    /// Number of decimals the raw price is scaled by.
    pub decimals: u32,
    /// When the source last updated.
    pub updated_at: DateTime<Utc>,
}

impl PriceQuote {
    /// Create a quote.
    #[must_use]
    pub fn new(raw: Decimal, decimals: u32, updated_at: DateTime<Utc>) -> Self {
        Self {
            raw,
            decimals,
            updated_at,
        }
    }

    /// The quote normalized to a natural decimal price, or `None` when
    /// the reported decimal count is outside the supported range.
    #[must_use]
    pub fn normalized(&self) -> Option<Price> {
        if self.decimals > MAX_FEED_DECIMALS {
            return None;
        }
        let scale = Decimal::from(10u64.pow(self.decimals));
        Some(Price::new(self.raw / scale))
    }
}

/// Read access to external price sources.
pub trait PriceFeed: Send + Sync {
    /// Latest price, update time and decimal count for a source.
    fn latest(&self, feed: FeedId) -> Result<PriceQuote>;
}

impl<T: PriceFeed + ?Sized> PriceFeed for std::sync::Arc<T> {
    fn latest(&self, feed: FeedId) -> Result<PriceQuote> {
        (**self).latest(feed)
    }
}

/// Instructions handed to the swap venue by a triggered execution.
///
/// The payload is opaque routing data produced by whoever built the fill
/// transaction; this layer only sizes the swap and checks the return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapInstructions {
    /// Amount of the primary asset to sell.
    pub sell_amount: Amount,
    /// Opaque venue routing payload.
    pub payload: Vec<u8>,
}

impl SwapInstructions {
    #[must_use]
    pub fn new(sell_amount: Amount, payload: Vec<u8>) -> Self {
        Self {
            sell_amount,
            payload,
        }
    }
}

/// The external swap-routing venue.
pub trait SwapVenue: Send + Sync {
    /// Execute a swap; returns the counter-asset amount received.
    fn swap(&self, instructions: &SwapInstructions) -> Result<Amount>;
}

/// The external order-matching/settlement engine.
///
/// The engine verified each order's signature, so it is the source of
/// truth for order ownership. It also owns the cancel primitive and the
/// fill path that keepers submit triggered orders through.
pub trait SettlementEngine: Send + Sync {
    /// Recorded owner of a signed order, if the engine knows it.
    fn owner_of(&self, fingerprint: OrderFingerprint) -> Option<AccountId>;

    /// Cancel (invalidate) an order so it can no longer fill.
    fn cancel(&self, fingerprint: OrderFingerprint) -> Result<()>;

    /// Ask the engine to attempt a fill of a triggered order. The engine
    /// drives its fill path and calls back into the conditional layer.
    fn submit_fill(&self, fingerprint: OrderFingerprint) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_normalization() {
        // 4000 USD with 8 feed decimals
        let quote = PriceQuote::new(dec!(400_000_000_000), 8, Utc::now());
        assert_eq!(quote.normalized().unwrap().inner(), dec!(4000));

        // Same value at 6 decimals normalizes identically
        let quote6 = PriceQuote::new(dec!(4_000_000_000), 6, Utc::now());
        assert_eq!(quote6.normalized(), quote.normalized());
    }

    #[test]
    fn test_quote_with_excessive_decimals_rejected() {
        let at = Utc::now();
        assert!(PriceQuote::new(dec!(1), MAX_FEED_DECIMALS, at)
            .normalized()
            .is_some());
        assert!(PriceQuote::new(dec!(1), MAX_FEED_DECIMALS + 1, at)
            .normalized()
            .is_none());
        // Counts that would overflow a u64 power never reach the scaling
        assert!(PriceQuote::new(dec!(1), 64, at).normalized().is_none());
    }
}
