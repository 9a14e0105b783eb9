//! Error types for condex-core.

use thiserror::Error;

/// Errors surfaced by external collaborators (price feeds, swap venue,
/// settlement engine) and by core type construction.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown price feed: {0}")]
    UnknownFeed(String),

    #[error("Unknown order: {0}")]
    UnknownOrder(String),

    #[error("Swap venue failure: {0}")]
    Venue(String),

    #[error("Settlement engine failure: {0}")]
    Settlement(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
