//! Identity types: order fingerprints, accounts, price feeds.
//!
//! Every piece of per-order state in the conditional layer is keyed by an
//! `OrderFingerprint` — the Keccak-256 content hash of the signed order as
//! produced by the settlement engine. Fingerprints are immutable once
//! created and opaque to this layer.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// Unique identifier of a signed order (32-byte content hash).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderFingerprint([u8; 32]);

impl OrderFingerprint {
    /// Wrap an existing 32-byte hash (e.g. received from the settlement
    /// engine).
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a fingerprint from serialized order content.
    #[must_use]
    pub fn from_content(content: &[u8]) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(content);
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for OrderFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form: first 4 bytes, enough to correlate log lines
        write!(f, "0x{}", hex::encode(&self.0[..4]))
    }
}

/// Account identity (20-byte address) for owners, keepers, the settlement
/// engine and the administrative role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId([u8; 20]);

impl AccountId {
    pub const ZERO: Self = Self([0u8; 20]);

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Build an account id from a small integer, big-endian in the low
    /// bytes. Convenient for fixtures and examples.
    #[must_use]
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Identity of a price source consumed through the `PriceFeed` trait.
///
/// The zero feed is reserved as "unset" and rejected by configuration
/// validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedId(AccountId);

impl FeedId {
    pub const ZERO: Self = Self(AccountId::ZERO);

    #[must_use]
    pub const fn new(account: AccountId) -> Self {
        Self(account)
    }

    #[must_use]
    pub fn from_low_u64(value: u64) -> Self {
        Self(AccountId::from_low_u64(value))
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
