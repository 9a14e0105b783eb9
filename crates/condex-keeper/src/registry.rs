//! Keeper registration and reward accrual.
//!
//! Administrative lifecycle, independent of any order: the admin
//! registers keeper identities and sets their reward parameters;
//! the scheduler accrues rewards as work completes.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use condex_core::{AccountId, Amount, OrderEvent, SharedRecordStore};
use dashmap::DashMap;
use tracing::info;

use crate::error::{KeeperError, KeeperResult};

/// Stored registration for one keeper identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeeperRegistration {
    /// Whether this keeper may currently perform work.
    pub authorized: bool,
    /// Reward accrued per completed action.
    pub reward_per_action: Amount,
    /// Total reward accrued so far.
    pub accrued: Amount,
}

/// Admin-managed keeper set.
pub struct KeeperRegistry {
    admin: AccountId,
    /// When set, unregistered callers may also perform work.
    open_access: AtomicBool,
    keepers: DashMap<AccountId, KeeperRegistration>,
    records: SharedRecordStore,
}

impl KeeperRegistry {
    #[must_use]
    pub fn new(admin: AccountId, open_access: bool, records: SharedRecordStore) -> Self {
        Self {
            admin,
            open_access: AtomicBool::new(open_access),
            keepers: DashMap::new(),
            records,
        }
    }

    /// Register a keeper (or update its reward rate). Admin only.
    pub fn register(
        &self,
        caller: AccountId,
        keeper: AccountId,
        reward_per_action: Amount,
        now: DateTime<Utc>,
    ) -> KeeperResult<()> {
        self.require_admin(caller)?;
        let mut entry = self.keepers.entry(keeper).or_insert(KeeperRegistration {
            authorized: true,
            reward_per_action,
            accrued: Amount::ZERO,
        });
        entry.authorized = true;
        entry.reward_per_action = reward_per_action;
        drop(entry);

        info!(%keeper, %reward_per_action, "keeper registered");
        self.records.append(OrderEvent::KeeperRegistered {
            keeper,
            authorized: true,
            at: now,
        });
        Ok(())
    }

    /// Revoke a keeper's authorization without dropping its accrued
    /// rewards. Admin only.
    pub fn deauthorize(
        &self,
        caller: AccountId,
        keeper: AccountId,
        now: DateTime<Utc>,
    ) -> KeeperResult<()> {
        self.require_admin(caller)?;
        if let Some(mut entry) = self.keepers.get_mut(&keeper) {
            entry.authorized = false;
        }
        self.records.append(OrderEvent::KeeperRegistered {
            keeper,
            authorized: false,
            at: now,
        });
        Ok(())
    }

    /// Flip open access. Admin only.
    pub fn set_open_access(&self, caller: AccountId, open: bool) -> KeeperResult<()> {
        self.require_admin(caller)?;
        self.open_access.store(open, Ordering::SeqCst);
        Ok(())
    }

    /// Whether this identity may perform work right now.
    #[must_use]
    pub fn is_authorized(&self, keeper: AccountId) -> bool {
        if self.open_access.load(Ordering::SeqCst) {
            return true;
        }
        self.keepers
            .get(&keeper)
            .map(|k| k.authorized)
            .unwrap_or(false)
    }

    /// Accrue rewards for `actions` completed actions. Unregistered
    /// keepers (open access) accrue nothing.
    pub fn accrue(&self, keeper: AccountId, actions: usize) {
        if let Some(mut entry) = self.keepers.get_mut(&keeper) {
            let reward = entry.reward_per_action * rust_decimal::Decimal::from(actions as u64);
            entry.accrued = entry.accrued + reward;
        }
    }

    /// Registration snapshot for one keeper.
    #[must_use]
    pub fn registration(&self, keeper: AccountId) -> Option<KeeperRegistration> {
        self.keepers.get(&keeper).map(|k| *k)
    }

    fn require_admin(&self, caller: AccountId) -> KeeperResult<()> {
        if caller != self.admin {
            return Err(KeeperError::Unauthorized(format!(
                "{caller} is not the keeper admin"
            )));
        }
        Ok(())
    }
}
