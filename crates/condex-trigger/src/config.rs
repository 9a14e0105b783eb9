//! Trigger configuration and validation bounds.

use condex_core::{AccountId, FeedId, Price};
use serde::{Deserialize, Serialize};

use crate::error::{TriggerError, TriggerResult};

/// Upper bound on tolerated slippage: 50%.
pub const MAX_SLIPPAGE_BPS: u32 = 5_000;
/// Upper bound on the per-sample deviation bound: 10%.
pub const MAX_DEVIATION_BPS: u32 = 1_000;
/// Largest supported asset decimal count.
pub const MAX_ASSET_DECIMALS: u32 = 18;

/// Which way the price must cross the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerDirection {
    /// Stop-loss: fires when price drops below the threshold.
    Falling,
    /// Take-profit: fires when price rises above the threshold.
    Rising,
}

impl TriggerDirection {
    /// Whether the trigger condition holds at `price`.
    #[must_use]
    pub fn is_met(&self, price: Price, threshold: Price) -> bool {
        match self {
            Self::Falling => price < threshold,
            Self::Rising => price > threshold,
        }
    }
}

/// Per-order trigger configuration, created once by the order owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Price source for the primary asset.
    pub feed_a: FeedId,
    /// Price source for the counter asset.
    pub feed_b: FeedId,
    /// Threshold price (primary in units of counter).
    pub threshold: Price,
    /// Falling (stop-loss) or rising (take-profit).
    pub direction: TriggerDirection,
    /// Tolerated execution slippage in basis points.
    pub max_slippage_bps: u32,
    /// Per-sample deviation bound in basis points (0 disables).
    pub max_deviation_bps: u32,
    /// If set, only this executor may be the configured fill executor.
    pub executor: Option<AccountId>,
    /// Primary asset decimal count.
    pub asset_a_decimals: u32,
    /// Counter asset decimal count.
    pub asset_b_decimals: u32,
}

impl TriggerConfig {
    /// Validate the configuration bounds. Rejections are atomic: an
    /// invalid config never reaches the store.
    pub fn validate(&self) -> TriggerResult<()> {
        if self.feed_a.is_zero() || self.feed_b.is_zero() {
            return Err(TriggerError::Configuration(
                "price sources must be non-zero".into(),
            ));
        }
        if !self.threshold.is_positive() {
            return Err(TriggerError::Configuration(
                "threshold must be positive".into(),
            ));
        }
        if self.max_slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(TriggerError::Configuration(format!(
                "slippage {} bps exceeds maximum {} bps",
                self.max_slippage_bps, MAX_SLIPPAGE_BPS
            )));
        }
        if self.max_deviation_bps > MAX_DEVIATION_BPS {
            return Err(TriggerError::Configuration(format!(
                "deviation bound {} bps exceeds maximum {} bps",
                self.max_deviation_bps, MAX_DEVIATION_BPS
            )));
        }
        if self.asset_a_decimals > MAX_ASSET_DECIMALS || self.asset_b_decimals > MAX_ASSET_DECIMALS
        {
            return Err(TriggerError::Configuration(format!(
                "asset decimals above {MAX_ASSET_DECIMALS} are unsupported"
            )));
        }
        Ok(())
    }
}
