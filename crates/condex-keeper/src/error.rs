//! Keeper error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeeperError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Work payload encoding: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type KeeperResult<T> = Result<T, KeeperError>;
