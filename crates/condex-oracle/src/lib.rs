//! Price oracle adapter: relative prices from external sources with
//! staleness checks, two-tier smoothing and deviation bounds.

pub mod adapter;
pub mod error;
pub mod history;

pub use adapter::{OracleAdapter, OracleConfig};
pub use error::{OracleError, OracleResult};
pub use history::{PriceSample, SampleHistory};
