//! Core domain types for the conditional order execution layer.
//!
//! This crate provides the fundamental types shared by every engine:
//! - `OrderFingerprint`: content hash identifying a signed order
//! - `AccountId`, `FeedId`: caller and price-source identities
//! - `Price`, `Amount`: precision-safe numeric types
//! - Collaborator traits for the settlement engine, price feeds and
//!   the swap venue
//! - `OrderEvent` / `RecordStore`: the append-only event log

pub mod decimal;
pub mod error;
pub mod events;
pub mod identity;
pub mod traits;

pub use decimal::{Amount, Price, BPS_DENOMINATOR};
pub use error::{CoreError, Result};
pub use events::{MemoryRecordStore, OrderEvent, RecordStore, SharedRecordStore};
pub use identity::{AccountId, FeedId, OrderFingerprint};
pub use traits::{
    PriceFeed, PriceQuote, SettlementEngine, SwapInstructions, SwapVenue, MAX_FEED_DECIMALS,
};
