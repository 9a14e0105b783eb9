//! Pair coordinator error types.

use condex_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcoError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Race condition: {0}")]
    RaceCondition(String),

    #[error("Transaction fee {fee} above cancellation ceiling {ceiling}")]
    FeeTooHigh { fee: String, ceiling: String },

    #[error(transparent)]
    Settlement(#[from] CoreError),
}

pub type OcoResult<T> = Result<T, OcoError>;
