//! Bounded per-fingerprint price sample histories.
//!
//! Each fingerprint owns a small, time-ordered ring of samples used for
//! recency-weighted averaging. Timestamps are clamped monotonically
//! non-decreasing: calls are serialized by the settlement layer, so a
//! regressing clock is treated as "same instant as the previous sample"
//! rather than an error.

use chrono::{DateTime, Duration, Utc};
use condex_core::Price;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One observed price with its timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSample {
    pub price: Price,
    pub at: DateTime<Utc>,
}

/// Time-ordered, bounded sample history for one fingerprint.
#[derive(Debug, Clone, Default)]
pub struct SampleHistory {
    samples: VecDeque<PriceSample>,
}

impl SampleHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample, clamping its timestamp to keep the history
    /// monotonically non-decreasing, then prune to `window` / `max_samples`.
    pub fn push(&mut self, price: Price, at: DateTime<Utc>, window: Duration, max_samples: usize) {
        let at = match self.samples.back() {
            Some(last) if at < last.at => last.at,
            _ => at,
        };
        self.samples.push_back(PriceSample { price, at });

        let cutoff = at - window;
        while let Some(front) = self.samples.front() {
            if front.at < cutoff || self.samples.len() > max_samples {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Most recent sample, if any.
    #[must_use]
    pub fn latest(&self) -> Option<PriceSample> {
        self.samples.back().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Recency-weighted average over samples within `window` of `now`,
    /// including `candidate` as a sample observed at `now`.
    ///
    /// Each sample is weighted by how much of the window remains after
    /// its age, so the candidate gets the full window weight and a sample
    /// at the window edge barely counts. A single spiked sample therefore
    /// cannot dominate the average.
    #[must_use]
    pub fn weighted_average(
        &self,
        candidate: Price,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Price {
        let window_secs = Decimal::from(window.num_seconds().max(1));
        let mut weighted_sum = candidate.inner() * window_secs;
        let mut weight_sum = window_secs;

        for sample in &self.samples {
            let age = (now - sample.at).num_seconds();
            if age < 0 || age > window.num_seconds() {
                continue;
            }
            let weight = window_secs - Decimal::from(age);
            if weight <= Decimal::ZERO {
                continue;
            }
            weighted_sum += sample.price.inner() * weight;
            weight_sum += weight;
        }

        Price::new(weighted_sum / weight_sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_push_clamps_regressing_timestamps() {
        let mut history = SampleHistory::new();
        let window = Duration::seconds(300);
        history.push(Price::new(dec!(100)), t0(), window, 64);
        history.push(
            Price::new(dec!(101)),
            t0() - Duration::seconds(10),
            window,
            64,
        );

        let latest = history.latest().unwrap();
        assert_eq!(latest.price.inner(), dec!(101));
        assert_eq!(latest.at, t0());
    }

    #[test]
    fn test_push_prunes_old_samples_and_caps_length() {
        let mut history = SampleHistory::new();
        let window = Duration::seconds(300);
        history.push(Price::new(dec!(1)), t0(), window, 4);
        for i in 1..=10 {
            history.push(
                Price::new(dec!(1)),
                t0() + Duration::seconds(i * 60),
                window,
                4,
            );
        }
        assert!(history.len() <= 4);
        // Everything older than the window relative to the newest is gone
        let newest = history.latest().unwrap().at;
        assert!(history.len() > 0);
        assert!((newest - t0()).num_seconds() >= 300);
    }

    #[test]
    fn test_weighted_average_resists_single_spike() {
        let mut history = SampleHistory::new();
        let window = Duration::seconds(300);
        // Steady price for the whole window
        for i in 0..5 {
            history.push(
                Price::new(dec!(100)),
                t0() + Duration::seconds(i * 60),
                window,
                64,
            );
        }
        let now = t0() + Duration::seconds(300);
        // Spiked candidate: average must sit well below the spike
        let smoothed = history.weighted_average(Price::new(dec!(200)), now, window);
        assert!(smoothed.inner() > dec!(100));
        assert!(smoothed.inner() < dec!(140));
    }

    #[test]
    fn test_weighted_average_with_empty_history_is_candidate() {
        let history = SampleHistory::new();
        let avg = history.weighted_average(Price::new(dec!(42)), t0(), Duration::seconds(300));
        assert_eq!(avg.inner(), dec!(42));
    }
}
