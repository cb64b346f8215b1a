//! Leaky-Bucket Rate Limiter
//!
//! Formulated as a credit balance that is replenished on every call by the
//! amount proportional to the time elapsed since the previous call, up to
//! `max_balance`. Each call presents the cost of an item; if the balance
//! covers it, the item is "purchased" and the balance reduced.
//!
//! Two typical uses:
//!
//! - limit messages per second: `credits_per_second` = allowed messages/sec,
//!   call `check_credit(1.0)` per message
//! - limit throughput: `credits_per_second` = allowed bytes/sec, call
//!   `check_credit(message_len as f64)`
//!
//! # Example
//!
//! ```ignore
//! let mut limiter = RateLimiter::new(10.0, 10.0)?; // 10 ops/sec, burst of 10
//! if limiter.check_credit(1.0) {
//!     do_work();
//! }
//! ```
//!
//! # Clock
//!
//! Time is read from `tokio::time::Instant`, which is monotonic, so the elapsed
//! time between ticks can never be negative. The elapsed time is still clamped
//! with `saturating_duration_since` in case a caller supplies instants out of
//! order. Under `tokio::time::pause()` the limiter follows the paused clock.

use crate::error::ConfigError;
#[cfg(debug_assertions)]
use crate::invariants::debug_assert_balance_bounded;
use rand::Rng;
use tokio::time::Instant;

/// Leaky-bucket credit balance.
///
/// The initial balance is drawn uniformly from `[0, max_balance)` so that many
/// limiters created at the same moment do not all burst together.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    credits_per_second: f64,
    max_balance: f64,
    balance: f64,
    last_tick: Instant,
}

fn validate(credits_per_second: f64, max_balance: f64) -> Result<(), ConfigError> {
    if !(credits_per_second.is_finite() && credits_per_second > 0.0) {
        return Err(ConfigError::InvalidCreditRate(credits_per_second));
    }
    if !(max_balance.is_finite() && max_balance > 0.0) {
        return Err(ConfigError::InvalidMaxBalance(max_balance));
    }
    Ok(())
}

impl RateLimiter {
    /// Creates a limiter with a randomized initial balance.
    pub fn new(credits_per_second: f64, max_balance: f64) -> Result<Self, ConfigError> {
        Self::with_rng(credits_per_second, max_balance, &mut rand::thread_rng())
    }

    /// Creates a limiter drawing its initial balance from `rng`.
    ///
    /// Use a seeded RNG for reproducible burst behavior.
    pub fn with_rng<R: Rng + ?Sized>(
        credits_per_second: f64,
        max_balance: f64,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        validate(credits_per_second, max_balance)?;
        let fraction: f64 = rng.gen();
        Ok(Self::with_balance_at(
            credits_per_second,
            max_balance,
            max_balance * fraction,
            Instant::now(),
        ))
    }

    pub(crate) fn with_balance_at(
        credits_per_second: f64,
        max_balance: f64,
        balance: f64,
        now: Instant,
    ) -> Self {
        Self {
            credits_per_second,
            max_balance,
            balance: balance.clamp(0.0, max_balance),
            last_tick: now,
        }
    }

    /// Returns `true` and deducts `item_cost` if the balance covers it.
    ///
    /// The balance is replenished first. When the item cannot be afforded
    /// the balance is left untouched. Negative costs are treated as zero.
    pub fn check_credit(&mut self, item_cost: f64) -> bool {
        self.check_credit_at(item_cost, Instant::now())
    }

    pub(crate) fn check_credit_at(&mut self, item_cost: f64, now: Instant) -> bool {
        self.replenish(now);
        let cost = item_cost.max(0.0);
        let granted = self.balance >= cost;
        if granted {
            self.balance -= cost;
        }

        #[cfg(debug_assertions)]
        debug_assert_balance_bounded!(self.balance, self.max_balance);

        granted
    }

    /// Changes the rate and bucket size.
    ///
    /// The balance is replenished under the old rate, then rescaled so the
    /// bucket stays exactly as full (proportionally) as it was.
    pub fn update(&mut self, credits_per_second: f64, max_balance: f64) -> Result<(), ConfigError> {
        self.update_at(credits_per_second, max_balance, Instant::now())
    }

    pub(crate) fn update_at(
        &mut self,
        credits_per_second: f64,
        max_balance: f64,
        now: Instant,
    ) -> Result<(), ConfigError> {
        validate(credits_per_second, max_balance)?;
        self.replenish(now);

        let balance = (max_balance * self.balance / self.max_balance).clamp(0.0, max_balance);
        self.credits_per_second = credits_per_second;
        self.max_balance = max_balance;
        self.balance = balance;

        #[cfg(debug_assertions)]
        debug_assert_balance_bounded!(self.balance, self.max_balance);

        Ok(())
    }

    fn replenish(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        if now > self.last_tick {
            self.last_tick = now;
        }
        self.balance =
            (self.balance + elapsed.as_secs_f64() * self.credits_per_second).min(self.max_balance);
    }

    /// Returns the balance as of the last tick.
    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn max_balance(&self) -> f64 {
        self.max_balance
    }

    pub fn credits_per_second(&self) -> f64 {
        self.credits_per_second
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_rejects_invalid_settings() {
        assert_eq!(
            RateLimiter::new(0.0, 1.0).unwrap_err(),
            ConfigError::InvalidCreditRate(0.0)
        );
        assert_eq!(
            RateLimiter::new(1.0, -2.0).unwrap_err(),
            ConfigError::InvalidMaxBalance(-2.0)
        );
        assert!(RateLimiter::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_initial_balance_is_randomized_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let balances: Vec<f64> = (0..32)
            .map(|_| {
                RateLimiter::with_rng(1.0, 10.0, &mut rng)
                    .unwrap()
                    .balance()
            })
            .collect();

        assert!(balances.iter().all(|b| (0.0..10.0).contains(b)));
        // Co-started limiters must not share the same starting point
        assert!(balances.windows(2).any(|w| (w[0] - w[1]).abs() > EPSILON));
    }

    #[test]
    fn test_seeded_limiters_are_reproducible() {
        let a = RateLimiter::with_rng(1.0, 5.0, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = RateLimiter::with_rng(1.0, 5.0, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a.balance(), b.balance());
    }

    #[test]
    fn test_check_credit_spends_and_refuses() {
        let start = Instant::now();
        let mut limiter = RateLimiter::with_balance_at(2.0, 2.0, 2.0, start);

        assert!(limiter.check_credit_at(1.0, start));
        assert!(limiter.check_credit_at(1.0, start));
        assert!(!limiter.check_credit_at(1.0, start));
        // A refused item leaves the balance alone
        assert!(limiter.balance().abs() < EPSILON);

        // 2 credits/sec: half a second buys one more item
        let later = start + Duration::from_millis(500);
        assert!(limiter.check_credit_at(1.0, later));
        assert!(!limiter.check_credit_at(1.0, later));
    }

    #[test]
    fn test_leak_rate_grants_after_waiting() {
        let start = Instant::now();
        let mut limiter = RateLimiter::with_balance_at(10.0, 100.0, 0.0, start);

        // 10 credits/sec for 0.25s = 2.5 credits
        let t = start + Duration::from_millis(250);
        assert!(!limiter.check_credit_at(3.0, t));
        assert!((limiter.balance() - 2.5).abs() < EPSILON);
        assert!(limiter.check_credit_at(2.5, t));
    }

    #[test]
    fn test_replenish_is_capped_by_max_balance() {
        let start = Instant::now();
        let mut limiter = RateLimiter::with_balance_at(100.0, 5.0, 0.0, start);

        let t = start + Duration::from_secs(60);
        assert!(!limiter.check_credit_at(6.0, t));
        assert!((limiter.balance() - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_out_of_order_instants_do_not_drain_balance() {
        let start = Instant::now();
        let later = start + Duration::from_secs(1);
        let mut limiter = RateLimiter::with_balance_at(1.0, 10.0, 0.0, later);

        // An instant before the last tick counts as zero elapsed time
        assert!(!limiter.check_credit_at(0.5, start));
        assert!(limiter.balance().abs() < EPSILON);
        assert!(limiter.check_credit_at(1.0, later + Duration::from_secs(1)));
    }

    #[test]
    fn test_negative_cost_is_free_but_does_not_mint_credit() {
        let start = Instant::now();
        let mut limiter = RateLimiter::with_balance_at(1.0, 1.0, 1.0, start);
        assert!(limiter.check_credit_at(-5.0, start));
        assert!((limiter.balance() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_update_preserves_fill_ratio() {
        let start = Instant::now();
        let mut limiter = RateLimiter::with_balance_at(1.0, 10.0, 5.0, start);

        limiter.update_at(2.0, 20.0, start).unwrap();
        assert!((limiter.balance() - 10.0).abs() < EPSILON);
        assert_eq!(limiter.max_balance(), 20.0);
        assert_eq!(limiter.credits_per_second(), 2.0);

        limiter.update_at(2.0, 4.0, start).unwrap();
        assert!((limiter.balance() - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_update_replenishes_under_old_rate_first() {
        let start = Instant::now();
        let mut limiter = RateLimiter::with_balance_at(1.0, 10.0, 0.0, start);

        // One second at the old rate fills 1/10 of the bucket
        limiter
            .update_at(50.0, 100.0, start + Duration::from_secs(1))
            .unwrap();
        assert!((limiter.balance() - 10.0).abs() < EPSILON);
    }

    #[test]
    fn test_update_rejects_invalid_values_without_changes() {
        let start = Instant::now();
        let mut limiter = RateLimiter::with_balance_at(1.0, 10.0, 5.0, start);
        assert!(limiter.update_at(1.0, 0.0, start).is_err());
        assert_eq!(limiter.max_balance(), 10.0);
        assert!((limiter.balance() - 5.0).abs() < EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follows_tokio_clock() {
        let mut limiter = RateLimiter::with_balance_at(4.0, 4.0, 0.0, Instant::now());
        assert!(!limiter.check_credit(1.0));

        tokio::time::advance(Duration::from_millis(250)).await;
        assert!(limiter.check_credit(1.0));
        assert!(!limiter.check_credit(1.0));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Check { cost: f64, wait_ms: u64 },
        Update { rate: f64, max: f64, wait_ms: u64 },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0.0f64..20.0, 0u64..2_000).prop_map(|(cost, wait_ms)| Op::Check { cost, wait_ms }),
            (0.1f64..50.0, 0.1f64..50.0, 0u64..2_000)
                .prop_map(|(rate, max, wait_ms)| Op::Update { rate, max, wait_ms }),
        ]
    }

    proptest! {
        /// Balance stays within [0, max_balance] for any sequence of calls.
        #[test]
        fn prop_balance_bounded(
            rate in 0.1f64..100.0,
            max in 0.1f64..100.0,
            fraction in 0.0f64..1.0,
            ops in proptest::collection::vec(op_strategy(), 1..64),
        ) {
            let mut now = Instant::now();
            let mut limiter = RateLimiter::with_balance_at(rate, max, max * fraction, now);

            for op in ops {
                match op {
                    Op::Check { cost, wait_ms } => {
                        now += Duration::from_millis(wait_ms);
                        limiter.check_credit_at(cost, now);
                    }
                    Op::Update { rate, max, wait_ms } => {
                        now += Duration::from_millis(wait_ms);
                        limiter.update_at(rate, max, now).unwrap();
                    }
                }
                prop_assert!(limiter.balance() >= 0.0);
                prop_assert!(limiter.balance() <= limiter.max_balance() + EPSILON);
            }
        }

        /// After waiting t seconds, credit c is granted iff min(b + r*t, max) >= c.
        #[test]
        fn prop_leak_rate(
            rate in 0.1f64..100.0,
            max in 0.1f64..100.0,
            fraction in 0.0f64..1.0,
            wait_ms in 0u64..5_000,
            cost in 0.0f64..100.0,
        ) {
            let start = Instant::now();
            let before = max * fraction;
            let mut limiter = RateLimiter::with_balance_at(rate, max, before, start);

            let wait = Duration::from_millis(wait_ms);
            let available = (before + wait.as_secs_f64() * rate).min(max);
            // Skip costs indistinguishable from the available balance
            prop_assume!((available - cost).abs() > 1e-6);

            let granted = limiter.check_credit_at(cost, start + wait);
            prop_assert_eq!(granted, available >= cost);
        }
    }
}
