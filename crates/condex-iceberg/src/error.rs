//! Disclosure controller error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IcebergError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Fill of {amount} exceeds the visible chunk remainder {visible}")]
    ChunkOverfill { amount: String, visible: String },
}

pub type IcebergResult<T> = Result<T, IcebergError>;
