//! Pair coordinator: mutually-exclusive order pairing
//! (one-cancels-other).

pub mod coordinator;
pub mod error;
pub mod link;

pub use coordinator::{CancelOutcome, CoordinatorConfig, PairCoordinator};
pub use error::{OcoError, OcoResult};
pub use link::{LinkState, PairLink, PairStrategy, ResolvedOutcome};
