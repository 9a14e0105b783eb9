//! Per-order trigger state machine and execution path.
//!
//! Lifecycle: `Configured → Executing → Executed`, with owner/admin
//! removal from any non-terminal state. "Triggered" is a derived
//! predicate over the smoothed price, never stored.
//!
//! The `Executing` state doubles as the re-entrancy guard required
//! around the external swap call: all internal state for the current
//! action is finalized before the venue is invoked, and a re-entrant
//! call observes `Executing` and fails.

use chrono::{DateTime, Utc};
use condex_core::{
    AccountId, Amount, OrderEvent, OrderFingerprint, Price, PriceFeed, SharedRecordStore,
    SwapInstructions, SwapVenue,
};
use condex_oracle::OracleAdapter;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::TriggerConfig;
use crate::error::{TriggerError, TriggerResult};

/// Stored lifecycle state of a configured trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerState {
    /// Configured and waiting on its price condition.
    Configured,
    /// A fill attempt is inside the execution path right now.
    Executing,
    /// Executed through the venue; terminal.
    Executed,
}

#[derive(Debug, Clone)]
struct TriggerEntry {
    owner: AccountId,
    config: TriggerConfig,
    state: TriggerState,
}

/// Stop-loss / take-profit evaluator.
///
/// One entry per fingerprint; the settlement engine consults
/// `compute_fillable` during fill attempts and drives `execute` on its
/// fill path. Keepers discover triggered orders via
/// `triggered_unexecuted`.
pub struct TriggerEvaluator<F: PriceFeed> {
    oracle: OracleAdapter<F>,
    engine_account: AccountId,
    admin: AccountId,
    entries: DashMap<OrderFingerprint, TriggerEntry>,
    records: SharedRecordStore,
}

impl<F: PriceFeed> TriggerEvaluator<F> {
    #[must_use]
    pub fn new(
        oracle: OracleAdapter<F>,
        engine_account: AccountId,
        admin: AccountId,
        records: SharedRecordStore,
    ) -> Self {
        Self {
            oracle,
            engine_account,
            admin,
            entries: DashMap::new(),
            records,
        }
    }

    /// Create or overwrite a trigger configuration.
    ///
    /// The first caller for a fingerprint becomes its owner; afterwards
    /// only that owner may overwrite, and never once executed.
    pub fn configure(
        &self,
        caller: AccountId,
        fingerprint: OrderFingerprint,
        config: TriggerConfig,
        now: DateTime<Utc>,
    ) -> TriggerResult<()> {
        config.validate()?;

        match self.entries.entry(fingerprint) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.owner != caller {
                    return Err(TriggerError::Unauthorized(format!(
                        "{caller} is not the owner of {fingerprint}"
                    )));
                }
                if entry.state != TriggerState::Configured {
                    return Err(TriggerError::Configuration(
                        "cannot reconfigure during or after execution".into(),
                    ));
                }
                entry.config = config.clone();
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(TriggerEntry {
                    owner: caller,
                    config: config.clone(),
                    state: TriggerState::Configured,
                });
            }
        }

        info!(%fingerprint, owner = %caller, threshold = %config.threshold, "trigger configured");
        self.records.append(OrderEvent::TriggerConfigured {
            fingerprint,
            owner: caller,
            threshold: config.threshold,
            at: now,
        });
        Ok(())
    }

    /// Remove a trigger. Owner or admin only; clears the sample history.
    pub fn remove(
        &self,
        caller: AccountId,
        fingerprint: OrderFingerprint,
        now: DateTime<Utc>,
    ) -> TriggerResult<()> {
        let Some(entry) = self.entries.get(&fingerprint) else {
            return Err(TriggerError::Configuration(format!(
                "no trigger configured for {fingerprint}"
            )));
        };
        if caller != entry.owner && caller != self.admin {
            return Err(TriggerError::Unauthorized(format!(
                "{caller} may not remove trigger for {fingerprint}"
            )));
        }
        if entry.state == TriggerState::Executing {
            return Err(TriggerError::ExecutionInProgress);
        }
        drop(entry);

        self.entries.remove(&fingerprint);
        self.oracle.clear(fingerprint);
        info!(%fingerprint, by = %caller, "trigger removed");
        self.records.append(OrderEvent::TriggerRemoved {
            fingerprint,
            by: caller,
            at: now,
        });
        Ok(())
    }

    /// Whether the trigger condition currently holds, and at what
    /// smoothed price. Read-only; never mutates state or history.
    pub fn is_triggered(
        &self,
        fingerprint: OrderFingerprint,
        now: DateTime<Utc>,
    ) -> TriggerResult<(bool, Price)> {
        let (config, _) = self.config_of(fingerprint)?;
        let raw = self.oracle.fetch(config.feed_a, config.feed_b, now)?;
        let smoothed = self.oracle.smoothed(fingerprint, raw, now);
        Ok((
            config.direction.is_met(smoothed, config.threshold),
            smoothed,
        ))
    }

    /// How much of the primary asset is currently fillable against
    /// `counter_amount` of the counter asset.
    ///
    /// Zero when the trigger has not fired — "not fillable", not an
    /// error — so the settlement engine can treat the order as simply
    /// unavailable. Monotonic in `counter_amount` when triggered.
    pub fn compute_fillable(
        &self,
        fingerprint: OrderFingerprint,
        counter_amount: Amount,
        now: DateTime<Utc>,
    ) -> TriggerResult<Amount> {
        let (config, state) = self.config_of(fingerprint)?;
        if state == TriggerState::Executed {
            return Ok(Amount::ZERO);
        }
        let (triggered, price) = self.is_triggered(fingerprint, now)?;
        if !triggered {
            debug!(%fingerprint, %price, "not triggered, fillable amount is zero");
            return Ok(Amount::ZERO);
        }
        Ok(convert_counter_to_primary(
            counter_amount,
            price,
            config.asset_a_decimals,
            config.asset_b_decimals,
        ))
    }

    /// Execute a triggered order through the swap venue.
    ///
    /// Callable only by the settlement engine's fill path; `taker` is the
    /// executor the engine is filling on behalf of and must match the
    /// configured executor when one was pinned. Re-checks the trigger,
    /// applies the deviation bound, enforces the slippage floor on the
    /// venue's return, records the realized price and terminates the
    /// state machine. A failure at any point restores `Configured`;
    /// price observations made along the way stay in the history.
    pub fn execute(
        &self,
        caller: AccountId,
        taker: AccountId,
        fingerprint: OrderFingerprint,
        instructions: &SwapInstructions,
        venue: &dyn SwapVenue,
        now: DateTime<Utc>,
    ) -> TriggerResult<Amount> {
        if caller != self.engine_account {
            return Err(TriggerError::Unauthorized(format!(
                "{caller} is not the settlement engine"
            )));
        }

        // Claim the in-progress guard, copying what the execution needs,
        // then release the map entry before any external call.
        let config = {
            let mut entry = self.entries.get_mut(&fingerprint).ok_or_else(|| {
                TriggerError::Configuration(format!("no trigger configured for {fingerprint}"))
            })?;
            if let Some(executor) = entry.config.executor {
                if executor != taker {
                    return Err(TriggerError::Unauthorized(format!(
                        "{taker} is not the configured executor for {fingerprint}"
                    )));
                }
            }
            match entry.state {
                TriggerState::Configured => {}
                TriggerState::Executing => return Err(TriggerError::ExecutionInProgress),
                TriggerState::Executed => {
                    return Err(TriggerError::Configuration(format!(
                        "trigger for {fingerprint} already executed"
                    )))
                }
            }
            entry.state = TriggerState::Executing;
            entry.config.clone()
        };

        let result = self.execute_inner(fingerprint, &config, instructions, venue, now);

        // Finalize the state machine after the external call returned.
        if let Some(mut entry) = self.entries.get_mut(&fingerprint) {
            entry.state = match result {
                Ok(_) => TriggerState::Executed,
                Err(_) => TriggerState::Configured,
            };
        }
        result
    }

    fn execute_inner(
        &self,
        fingerprint: OrderFingerprint,
        config: &TriggerConfig,
        instructions: &SwapInstructions,
        venue: &dyn SwapVenue,
        now: DateTime<Utc>,
    ) -> TriggerResult<Amount> {
        let raw = self.oracle.fetch(config.feed_a, config.feed_b, now)?;
        let smoothed = self.oracle.smoothed(fingerprint, raw, now);
        if !config.direction.is_met(smoothed, config.threshold) {
            return Err(TriggerError::NotTriggered);
        }
        // The observation is judged against the samples recorded before
        // it (keeper scans and prior attempts), then joins the history.
        self.oracle
            .check_deviation(fingerprint, raw, config.max_deviation_bps)?;
        self.oracle.record(fingerprint, raw, now);

        let expected = convert_primary_to_counter(
            instructions.sell_amount,
            smoothed,
            config.asset_a_decimals,
            config.asset_b_decimals,
        );
        let received = venue.swap(instructions)?;

        let floor = expected
            .mul_bps(condex_core::BPS_DENOMINATOR - config.max_slippage_bps);
        if received < floor {
            warn!(%fingerprint, %received, %floor, "swap return below slippage floor");
            return Err(TriggerError::Slippage { floor, received });
        }

        let realized = realized_price(
            instructions.sell_amount,
            received,
            config.asset_a_decimals,
            config.asset_b_decimals,
        )
        .unwrap_or(smoothed);
        self.oracle.record(fingerprint, realized, now);

        info!(%fingerprint, %realized, sold = %instructions.sell_amount, %received, "trigger executed");
        self.records.append(OrderEvent::TriggerExecuted {
            fingerprint,
            executed_price: realized,
            sold: instructions.sell_amount,
            received,
            at: now,
        });
        Ok(received)
    }

    /// Triggered-but-unexecuted orders, for keeper discovery.
    ///
    /// Each scanned order's observed price is folded into its sample
    /// history, so the keeper polling cadence is what feeds smoothing
    /// and the deviation bound. Orders whose feeds are currently stale
    /// are skipped, not surfaced as errors: the keeper retries on its
    /// next poll.
    #[must_use]
    pub fn triggered_unexecuted(&self, now: DateTime<Utc>) -> Vec<(OrderFingerprint, Price)> {
        let candidates: Vec<OrderFingerprint> = self
            .entries
            .iter()
            .filter(|entry| entry.state == TriggerState::Configured)
            .map(|entry| *entry.key())
            .collect();

        let mut triggered = Vec::new();
        for fingerprint in candidates {
            match self.observe(fingerprint, now) {
                Ok((true, price)) => triggered.push((fingerprint, price)),
                Ok((false, _)) => {}
                Err(err) => debug!(%fingerprint, %err, "skipping trigger during work scan"),
            }
        }
        triggered
    }

    /// Evaluate one order, recording the observed price as a sample.
    fn observe(
        &self,
        fingerprint: OrderFingerprint,
        now: DateTime<Utc>,
    ) -> TriggerResult<(bool, Price)> {
        let (config, _) = self.config_of(fingerprint)?;
        let raw = self.oracle.fetch(config.feed_a, config.feed_b, now)?;
        let smoothed = self.oracle.record_and_smooth(fingerprint, raw, now);
        Ok((
            config.direction.is_met(smoothed, config.threshold),
            smoothed,
        ))
    }

    /// Current lifecycle state, if configured.
    #[must_use]
    pub fn state_of(&self, fingerprint: OrderFingerprint) -> Option<TriggerState> {
        self.entries.get(&fingerprint).map(|e| e.state)
    }

    /// Recorded owner, if configured.
    #[must_use]
    pub fn owner_of(&self, fingerprint: OrderFingerprint) -> Option<AccountId> {
        self.entries.get(&fingerprint).map(|e| e.owner)
    }

    /// The oracle adapter backing this evaluator.
    #[must_use]
    pub fn oracle(&self) -> &OracleAdapter<F> {
        &self.oracle
    }

    fn config_of(
        &self,
        fingerprint: OrderFingerprint,
    ) -> TriggerResult<(TriggerConfig, TriggerState)> {
        self.entries
            .get(&fingerprint)
            .map(|e| (e.config.clone(), e.state))
            .ok_or_else(|| {
                TriggerError::Configuration(format!("no trigger configured for {fingerprint}"))
            })
    }
}

fn pow10(decimals: u32) -> Decimal {
    Decimal::from(10u64.pow(decimals))
}

/// Convert a counter-asset amount (base units) to the primary-asset
/// amount (base units) at `price` (primary in units of counter).
#[must_use]
pub fn convert_counter_to_primary(
    counter: Amount,
    price: Price,
    asset_a_decimals: u32,
    asset_b_decimals: u32,
) -> Amount {
    if price.is_zero() {
        return Amount::ZERO;
    }
    Amount::new(
        counter.inner() / price.inner() * pow10(asset_a_decimals) / pow10(asset_b_decimals),
    )
}

/// Convert a primary-asset amount (base units) to the counter-asset
/// amount (base units) at `price`.
#[must_use]
pub fn convert_primary_to_counter(
    primary: Amount,
    price: Price,
    asset_a_decimals: u32,
    asset_b_decimals: u32,
) -> Amount {
    Amount::new(
        primary.inner() * price.inner() * pow10(asset_b_decimals) / pow10(asset_a_decimals),
    )
}

/// Realized execution price implied by a swap's amounts.
#[must_use]
pub fn realized_price(
    sold: Amount,
    received: Amount,
    asset_a_decimals: u32,
    asset_b_decimals: u32,
) -> Option<Price> {
    if sold.is_zero() {
        return None;
    }
    Some(Price::new(
        received.inner() / pow10(asset_b_decimals) / (sold.inner() / pow10(asset_a_decimals)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TriggerDirection;
    use chrono::Duration;
    use condex_core::{CoreError, FeedId, MemoryRecordStore, PriceQuote};
    use condex_oracle::{OracleConfig, OracleError};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    struct StaticFeed {
        quotes: DashMap<FeedId, PriceQuote>,
    }

    impl StaticFeed {
        fn new() -> Self {
            Self {
                quotes: DashMap::new(),
            }
        }

        fn set(&self, feed: FeedId, raw: Decimal, decimals: u32, at: DateTime<Utc>) {
            self.quotes.insert(feed, PriceQuote::new(raw, decimals, at));
        }
    }

    impl PriceFeed for StaticFeed {
        fn latest(&self, feed: FeedId) -> condex_core::Result<PriceQuote> {
            self.quotes
                .get(&feed)
                .map(|q| *q)
                .ok_or_else(|| CoreError::UnknownFeed(feed.to_string()))
        }
    }

    struct FixedVenue {
        returns: Amount,
    }

    impl SwapVenue for FixedVenue {
        fn swap(&self, _instructions: &SwapInstructions) -> condex_core::Result<Amount> {
            Ok(self.returns)
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn fp() -> OrderFingerprint {
        OrderFingerprint::from_content(b"trigger-test")
    }

    fn owner() -> AccountId {
        AccountId::from_low_u64(10)
    }

    fn engine() -> AccountId {
        AccountId::from_low_u64(1)
    }

    fn admin() -> AccountId {
        AccountId::from_low_u64(2)
    }

    /// Evaluator with both feeds at equal decimals and A/B price
    /// `price_a` (B pinned at 1).
    fn evaluator_at(price_a: Decimal) -> TriggerEvaluator<StaticFeed> {
        let feed = StaticFeed::new();
        feed.set(FeedId::from_low_u64(1), price_a, 0, t0());
        feed.set(FeedId::from_low_u64(2), dec!(1), 0, t0());
        TriggerEvaluator::new(
            OracleAdapter::new(feed, OracleConfig::default()),
            engine(),
            admin(),
            MemoryRecordStore::new_shared(),
        )
    }

    /// Like `evaluator_at`, but keeps a handle to the feed so tests can
    /// move the price later.
    fn evaluator_with_feed(
        price_a: Decimal,
    ) -> (TriggerEvaluator<Arc<StaticFeed>>, Arc<StaticFeed>) {
        let feed = Arc::new(StaticFeed::new());
        feed.set(FeedId::from_low_u64(1), price_a, 0, t0());
        feed.set(FeedId::from_low_u64(2), dec!(1), 0, t0());
        let evaluator = TriggerEvaluator::new(
            OracleAdapter::new(Arc::clone(&feed), OracleConfig::default()),
            engine(),
            admin(),
            MemoryRecordStore::new_shared(),
        );
        (evaluator, feed)
    }

    fn stop_loss_at_4500() -> TriggerConfig {
        TriggerConfig {
            feed_a: FeedId::from_low_u64(1),
            feed_b: FeedId::from_low_u64(2),
            threshold: Price::new(dec!(4500)),
            direction: TriggerDirection::Falling,
            max_slippage_bps: 100,
            max_deviation_bps: 0,
            executor: None,
            asset_a_decimals: 0,
            asset_b_decimals: 0,
        }
    }

    #[test]
    fn test_first_configure_sets_owner() {
        let evaluator = evaluator_at(dec!(4000));
        evaluator
            .configure(owner(), fp(), stop_loss_at_4500(), t0())
            .unwrap();
        assert_eq!(evaluator.owner_of(fp()), Some(owner()));
        assert_eq!(evaluator.state_of(fp()), Some(TriggerState::Configured));
    }

    #[test]
    fn test_overwrite_requires_same_owner() {
        let evaluator = evaluator_at(dec!(4000));
        evaluator
            .configure(owner(), fp(), stop_loss_at_4500(), t0())
            .unwrap();

        let intruder = AccountId::from_low_u64(99);
        let err = evaluator
            .configure(intruder, fp(), stop_loss_at_4500(), t0())
            .unwrap_err();
        assert!(matches!(err, TriggerError::Unauthorized(_)));

        // Same owner may overwrite idempotently
        evaluator
            .configure(owner(), fp(), stop_loss_at_4500(), t0())
            .unwrap();
    }

    #[test]
    fn test_stop_loss_triggers_below_threshold_only() {
        let evaluator = evaluator_at(dec!(4000));
        evaluator
            .configure(owner(), fp(), stop_loss_at_4500(), t0())
            .unwrap();
        let (triggered, price) = evaluator.is_triggered(fp(), t0()).unwrap();
        assert!(triggered);
        assert_eq!(price.inner(), dec!(4000));

        let at_threshold = evaluator_at(dec!(4500));
        at_threshold
            .configure(owner(), fp(), stop_loss_at_4500(), t0())
            .unwrap();
        let (triggered, _) = at_threshold.is_triggered(fp(), t0()).unwrap();
        assert!(!triggered);
    }

    #[test]
    fn test_take_profit_triggers_above_threshold_only() {
        let mut config = stop_loss_at_4500();
        config.direction = TriggerDirection::Rising;

        let evaluator = evaluator_at(dec!(5000));
        evaluator.configure(owner(), fp(), config.clone(), t0()).unwrap();
        assert!(evaluator.is_triggered(fp(), t0()).unwrap().0);

        let below = evaluator_at(dec!(4500));
        below.configure(owner(), fp(), config, t0()).unwrap();
        assert!(!below.is_triggered(fp(), t0()).unwrap().0);
    }

    #[test]
    fn test_fillable_zero_when_untriggered() {
        let evaluator = evaluator_at(dec!(5000));
        evaluator
            .configure(owner(), fp(), stop_loss_at_4500(), t0())
            .unwrap();
        let fillable = evaluator
            .compute_fillable(fp(), Amount::new(dec!(450)), t0())
            .unwrap();
        assert_eq!(fillable, Amount::ZERO);
    }

    #[test]
    fn test_fillable_converts_and_is_monotonic() {
        let evaluator = evaluator_at(dec!(4000));
        evaluator
            .configure(owner(), fp(), stop_loss_at_4500(), t0())
            .unwrap();
        let small = evaluator
            .compute_fillable(fp(), Amount::new(dec!(400)), t0())
            .unwrap();
        let large = evaluator
            .compute_fillable(fp(), Amount::new(dec!(800)), t0())
            .unwrap();
        // 400 counter at price 4000 = 0.1 primary
        assert_eq!(small.inner(), dec!(0.1));
        assert_eq!(large.inner(), dec!(0.2));
        assert!(large > small);
    }

    #[test]
    fn test_conversion_rescales_decimals() {
        // 450 USDC (6 decimals) at 4500 = 0.1 WETH (18 decimals)
        let primary = convert_counter_to_primary(
            Amount::new(dec!(450_000_000)),
            Price::new(dec!(4500)),
            18,
            6,
        );
        assert_eq!(primary.inner(), dec!(100_000_000_000_000_000));

        let counter = convert_primary_to_counter(primary, Price::new(dec!(4500)), 18, 6);
        assert_eq!(counter.inner(), dec!(450_000_000));
    }

    #[test]
    fn test_execute_happy_path() {
        let evaluator = evaluator_at(dec!(4000));
        evaluator
            .configure(owner(), fp(), stop_loss_at_4500(), t0())
            .unwrap();

        // Sell 0.1 primary at smoothed 4000: expected 400 counter.
        let venue = FixedVenue {
            returns: Amount::new(dec!(398)), // within 100 bps of 400
        };
        let instructions = SwapInstructions::new(Amount::new(dec!(0.1)), vec![]);
        let received = evaluator
            .execute(engine(), owner(), fp(), &instructions, &venue, t0())
            .unwrap();
        assert_eq!(received.inner(), dec!(398));
        assert_eq!(evaluator.state_of(fp()), Some(TriggerState::Executed));

        // Realized price sample recorded: 398 / 0.1 = 3980
        let sample = evaluator.oracle().last_sample(fp()).unwrap();
        assert_eq!(sample.price.inner(), dec!(3980));
    }

    #[test]
    fn test_execute_rejects_non_engine_caller() {
        let evaluator = evaluator_at(dec!(4000));
        evaluator
            .configure(owner(), fp(), stop_loss_at_4500(), t0())
            .unwrap();
        let venue = FixedVenue {
            returns: Amount::new(dec!(400)),
        };
        let instructions = SwapInstructions::new(Amount::new(dec!(0.1)), vec![]);
        let err = evaluator
            .execute(owner(), owner(), fp(), &instructions, &venue, t0())
            .unwrap_err();
        assert!(matches!(err, TriggerError::Unauthorized(_)));
        assert_eq!(evaluator.state_of(fp()), Some(TriggerState::Configured));
    }

    #[test]
    fn test_execute_respects_pinned_executor() {
        let executor = AccountId::from_low_u64(42);
        let mut config = stop_loss_at_4500();
        config.executor = Some(executor);

        let evaluator = evaluator_at(dec!(4000));
        evaluator.configure(owner(), fp(), config, t0()).unwrap();
        let venue = FixedVenue {
            returns: Amount::new(dec!(400)),
        };
        let instructions = SwapInstructions::new(Amount::new(dec!(0.1)), vec![]);

        let err = evaluator
            .execute(engine(), owner(), fp(), &instructions, &venue, t0())
            .unwrap_err();
        assert!(matches!(err, TriggerError::Unauthorized(_)));
        assert_eq!(evaluator.state_of(fp()), Some(TriggerState::Configured));

        evaluator
            .execute(engine(), executor, fp(), &instructions, &venue, t0())
            .unwrap();
        assert_eq!(evaluator.state_of(fp()), Some(TriggerState::Executed));
    }

    #[test]
    fn test_execute_slippage_aborts_without_state_change() {
        let evaluator = evaluator_at(dec!(4000));
        evaluator
            .configure(owner(), fp(), stop_loss_at_4500(), t0())
            .unwrap();
        let venue = FixedVenue {
            returns: Amount::new(dec!(390)), // below 396 floor (100 bps of 400)
        };
        let instructions = SwapInstructions::new(Amount::new(dec!(0.1)), vec![]);
        let err = evaluator
            .execute(engine(), owner(), fp(), &instructions, &venue, t0())
            .unwrap_err();
        assert!(matches!(err, TriggerError::Slippage { .. }));
        // State machine restored; the observed price stays recorded
        assert_eq!(evaluator.state_of(fp()), Some(TriggerState::Configured));
        let sample = evaluator.oracle().last_sample(fp()).unwrap();
        assert_eq!(sample.price.inner(), dec!(4000));
    }

    #[test]
    fn test_execute_when_untriggered_fails() {
        let evaluator = evaluator_at(dec!(5000));
        evaluator
            .configure(owner(), fp(), stop_loss_at_4500(), t0())
            .unwrap();
        let venue = FixedVenue {
            returns: Amount::new(dec!(500)),
        };
        let instructions = SwapInstructions::new(Amount::new(dec!(0.1)), vec![]);
        let err = evaluator
            .execute(engine(), owner(), fp(), &instructions, &venue, t0())
            .unwrap_err();
        assert!(matches!(err, TriggerError::NotTriggered));
    }

    #[test]
    fn test_work_scan_records_price_samples() {
        let evaluator = evaluator_at(dec!(5000));
        evaluator
            .configure(owner(), fp(), stop_loss_at_4500(), t0())
            .unwrap();
        assert!(evaluator.triggered_unexecuted(t0()).is_empty());
        let sample = evaluator.oracle().last_sample(fp()).unwrap();
        assert_eq!(sample.price.inner(), dec!(5000));
        assert_eq!(sample.at, t0());
    }

    #[test]
    fn test_deviation_bound_rejects_flash_crash() {
        let (evaluator, feed) = evaluator_with_feed(dec!(5000));
        let mut config = stop_loss_at_4500();
        config.max_deviation_bps = 1000;
        evaluator.configure(owner(), fp(), config, t0()).unwrap();

        // Routine keeper scan at 5000 seeds the history
        assert!(evaluator.triggered_unexecuted(t0()).is_empty());

        // Seconds later the pair collapses far past the 10% bound
        let crash = t0() + Duration::seconds(10);
        feed.set(FeedId::from_low_u64(1), dec!(125), 0, crash);
        let venue = FixedVenue {
            returns: Amount::new(dec!(13)),
        };
        let instructions = SwapInstructions::new(Amount::new(dec!(0.1)), vec![]);
        let err = evaluator
            .execute(engine(), owner(), fp(), &instructions, &venue, crash)
            .unwrap_err();
        assert!(matches!(
            err,
            TriggerError::Oracle(OracleError::Manipulation { .. })
        ));
        assert_eq!(evaluator.state_of(fp()), Some(TriggerState::Configured));
    }

    #[test]
    fn test_remove_by_owner_and_admin_only() {
        let evaluator = evaluator_at(dec!(4000));
        evaluator
            .configure(owner(), fp(), stop_loss_at_4500(), t0())
            .unwrap();

        let intruder = AccountId::from_low_u64(99);
        assert!(evaluator.remove(intruder, fp(), t0()).is_err());
        assert!(evaluator.remove(admin(), fp(), t0()).is_ok());
        assert!(evaluator.state_of(fp()).is_none());
    }

    #[test]
    fn test_triggered_unexecuted_scan() {
        let evaluator = evaluator_at(dec!(4000));
        evaluator
            .configure(owner(), fp(), stop_loss_at_4500(), t0())
            .unwrap();
        let work = evaluator.triggered_unexecuted(t0());
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].0, fp());

        // Execute it; the scan must come back empty
        let venue = FixedVenue {
            returns: Amount::new(dec!(400)),
        };
        let instructions = SwapInstructions::new(Amount::new(dec!(0.1)), vec![]);
        evaluator
            .execute(engine(), owner(), fp(), &instructions, &venue, t0())
            .unwrap();
        assert!(evaluator.triggered_unexecuted(t0() + Duration::seconds(1)).is_empty());
    }
}
