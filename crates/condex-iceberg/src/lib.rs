//! Disclosure controller: progressive size disclosure (iceberg) for
//! signed limit orders.

pub mod controller;
pub mod error;
pub mod strategy;

pub use controller::{ChunkView, DisclosureController, IcebergParams};
pub use error::{IcebergError, IcebergResult};
pub use strategy::RevealStrategy;
