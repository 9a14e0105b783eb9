//! Oracle error types.

use condex_core::{CoreError, FeedId};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Stale data from feed {feed}: age {age_secs}s exceeds heartbeat {heartbeat_secs}s")]
    StaleData {
        feed: FeedId,
        age_secs: i64,
        heartbeat_secs: i64,
    },

    #[error("Feed {feed} reported a non-positive price")]
    InvalidQuote { feed: FeedId },

    #[error("Price deviation {deviation_bps} bps exceeds bound {max_bps} bps")]
    Manipulation {
        deviation_bps: Decimal,
        max_bps: u32,
    },

    #[error(transparent)]
    Feed(#[from] CoreError),
}

pub type OracleResult<T> = Result<T, OracleError>;
