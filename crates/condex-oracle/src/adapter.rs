//! Oracle adapter: relative prices with staleness, smoothing and
//! deviation enforcement.
//!
//! The two-tier smoothing scheme trades responsiveness against flash
//! manipulation: inside the fast window the raw price is used directly,
//! outside it a recency-weighted average over the longer window applies.
//! Both windows are policy knobs, not constants.

use chrono::{DateTime, Duration, Utc};
use condex_core::{FeedId, OrderFingerprint, Price, PriceFeed};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::error::{OracleError, OracleResult};
use crate::history::SampleHistory;

/// Oracle adapter configuration. All durations in seconds.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OracleConfig {
    /// Default max age of a feed update before it is considered stale.
    pub default_heartbeat_secs: i64,
    /// Per-feed heartbeat overrides.
    #[serde(default)]
    pub heartbeat_overrides: Vec<(FeedId, i64)>,
    /// Window inside which the latest raw price is used directly.
    pub fast_window_secs: i64,
    /// Window over which the weighted average is computed.
    pub twap_window_secs: i64,
    /// Cap on stored samples per fingerprint.
    pub max_samples: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            default_heartbeat_secs: 300,
            heartbeat_overrides: Vec::new(),
            fast_window_secs: 120,
            twap_window_secs: 300,
            max_samples: 64,
        }
    }
}

impl OracleConfig {
    fn heartbeat(&self, feed: FeedId) -> i64 {
        self.heartbeat_overrides
            .iter()
            .find(|(f, _)| *f == feed)
            .map(|(_, secs)| *secs)
            .unwrap_or(self.default_heartbeat_secs)
    }

    fn fast_window(&self) -> Duration {
        Duration::seconds(self.fast_window_secs)
    }

    fn twap_window(&self) -> Duration {
        Duration::seconds(self.twap_window_secs)
    }
}

/// Manipulation-resistant price source for the conditional engines.
///
/// Owns one bounded sample history per fingerprint. All reads are
/// synchronous; `smoothed` never mutates, only `record` does.
pub struct OracleAdapter<F: PriceFeed> {
    feed: F,
    config: OracleConfig,
    histories: DashMap<OrderFingerprint, SampleHistory>,
}

impl<F: PriceFeed> OracleAdapter<F> {
    #[must_use]
    pub fn new(feed: F, config: OracleConfig) -> Self {
        Self {
            feed,
            config,
            histories: DashMap::new(),
        }
    }

    /// Relative price of asset A in units of asset B.
    ///
    /// Reads both sources, rejects stale, non-positive or
    /// out-of-range-decimal quotes, and normalizes differing source
    /// decimal counts before dividing.
    pub fn fetch(&self, feed_a: FeedId, feed_b: FeedId, now: DateTime<Utc>) -> OracleResult<Price> {
        let price_a = self.validated_price(feed_a, now)?;
        let price_b = self.validated_price(feed_b, now)?;
        Ok(Price::new(price_a.inner() / price_b.inner()))
    }

    fn validated_price(&self, feed: FeedId, now: DateTime<Utc>) -> OracleResult<Price> {
        let quote = self.feed.latest(feed)?;
        let age_secs = (now - quote.updated_at).num_seconds();
        let heartbeat_secs = self.config.heartbeat(feed);
        if age_secs > heartbeat_secs {
            warn!(%feed, age_secs, heartbeat_secs, "stale price source");
            return Err(OracleError::StaleData {
                feed,
                age_secs,
                heartbeat_secs,
            });
        }
        // The decimal count is source-reported data; normalization
        // rejects counts past the supported range.
        let Some(price) = quote.normalized() else {
            warn!(%feed, decimals = quote.decimals, "unsupported quote decimal count");
            return Err(OracleError::InvalidQuote { feed });
        };
        if !price.is_positive() {
            return Err(OracleError::InvalidQuote { feed });
        }
        Ok(price)
    }

    /// Smoothed price for a fingerprint, given the latest raw price.
    ///
    /// Read-only. Inside the fast window since the most recent stored
    /// sample, the raw price is returned directly; otherwise the
    /// recency-weighted average over the TWAP window (including the
    /// candidate) applies.
    #[must_use]
    pub fn smoothed(&self, fingerprint: OrderFingerprint, latest: Price, now: DateTime<Utc>) -> Price {
        let Some(history) = self.histories.get(&fingerprint) else {
            return latest;
        };
        if let Some(newest) = history.latest() {
            if now - newest.at <= self.config.fast_window() {
                return latest;
            }
        }
        history.weighted_average(latest, now, self.config.twap_window())
    }

    /// Append a sample to a fingerprint's history.
    pub fn record(&self, fingerprint: OrderFingerprint, price: Price, now: DateTime<Utc>) {
        let mut history = self.histories.entry(fingerprint).or_default();
        history.push(
            price,
            now,
            self.config.twap_window(),
            self.config.max_samples,
        );
        debug!(%fingerprint, %price, samples = history.len(), "recorded price sample");
    }

    /// Smooth an observation against the existing history, then fold
    /// it into that history.
    ///
    /// Smoothing runs first so the observation is judged by the samples
    /// recorded before it, not by itself.
    pub fn record_and_smooth(
        &self,
        fingerprint: OrderFingerprint,
        price: Price,
        now: DateTime<Utc>,
    ) -> Price {
        let smoothed = self.smoothed(fingerprint, price, now);
        self.record(fingerprint, price, now);
        smoothed
    }

    /// Reject prices that moved more than `max_deviation_bps` from the
    /// most recent stored sample. No-op when no prior sample exists or
    /// the bound is zero.
    pub fn check_deviation(
        &self,
        fingerprint: OrderFingerprint,
        new_price: Price,
        max_deviation_bps: u32,
    ) -> OracleResult<()> {
        if max_deviation_bps == 0 {
            return Ok(());
        }
        let Some(last) = self
            .histories
            .get(&fingerprint)
            .and_then(|h| h.latest())
        else {
            return Ok(());
        };
        let Some(deviation_bps) = new_price.deviation_bps(last.price) else {
            return Ok(());
        };
        if deviation_bps > rust_decimal::Decimal::from(max_deviation_bps) {
            warn!(
                %fingerprint,
                %deviation_bps,
                max_deviation_bps,
                "price deviation bound exceeded"
            );
            return Err(OracleError::Manipulation {
                deviation_bps,
                max_bps: max_deviation_bps,
            });
        }
        Ok(())
    }

    /// Most recent recorded sample for a fingerprint.
    #[must_use]
    pub fn last_sample(&self, fingerprint: OrderFingerprint) -> Option<crate::history::PriceSample> {
        self.histories.get(&fingerprint).and_then(|h| h.latest())
    }

    /// Drop the sample history for a fingerprint (on removal/execution).
    pub fn clear(&self, fingerprint: OrderFingerprint) {
        self.histories.remove(&fingerprint);
    }

    /// Adapter configuration.
    #[must_use]
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }
}
