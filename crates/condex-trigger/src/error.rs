//! Trigger evaluator error types.

use condex_core::{Amount, CoreError};
use condex_oracle::OracleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Trigger condition not met")]
    NotTriggered,

    #[error("Execution already in progress")]
    ExecutionInProgress,

    #[error("Slippage: received {received} below floor {floor}")]
    Slippage { floor: Amount, received: Amount },

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    External(#[from] CoreError),
}

pub type TriggerResult<T> = Result<T, TriggerError>;
