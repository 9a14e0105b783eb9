//! Trigger evaluator: threshold-triggered market conversion
//! (stop-loss / take-profit) for signed limit orders.

pub mod config;
pub mod error;
pub mod evaluator;

pub use config::{TriggerConfig, TriggerDirection, MAX_ASSET_DECIMALS, MAX_DEVIATION_BPS, MAX_SLIPPAGE_BPS};
pub use error::{TriggerError, TriggerResult};
pub use evaluator::{TriggerEvaluator, TriggerState};
