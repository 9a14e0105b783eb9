//! Keeper scheduler: discovers due work across the conditional engines
//! and dispatches it on behalf of registered keepers.

pub mod error;
pub mod keeper_loop;
pub mod registry;
pub mod scheduler;

pub use error::{KeeperError, KeeperResult};
pub use keeper_loop::KeeperLoop;
pub use registry::{KeeperRegistration, KeeperRegistry};
pub use scheduler::{KeeperAction, KeeperScheduler, SchedulerConfig, WorkBatch, WorkReport};
