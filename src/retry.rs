//! Retry policy and backoff calculation.
//!
//! [`RetryPolicy`] is the explicit state machine behind the controller's
//! retry loop. It knows nothing about timers or transports: each call to
//! [`RetryPolicy::next()`] records one failed attempt and answers whether to
//! retry (and after how long) or give up. The controller owns the sleeping.

use std::time::Duration;

use crate::FetchOptions;

/// Decision taken after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then issue retry number `attempt` (1-indexed).
    Retry { attempt: u32, delay: Duration },
    /// `max_retries` is exhausted; the cycle ends in `Error`.
    GiveUp,
}

/// Exponential backoff state for one trigger cycle.
///
/// ```rust
/// # use huginn::{FetchOptions, RetryDecision, RetryPolicy};
/// # use std::time::Duration;
/// let options = FetchOptions::new()
///     .max_retries(2)
///     .base_backoff(Duration::from_millis(100));
/// let mut policy = RetryPolicy::new(&options);
/// assert_eq!(
///     policy.next(),
///     RetryDecision::Retry { attempt: 1, delay: Duration::from_millis(100) }
/// );
/// assert_eq!(
///     policy.next(),
///     RetryDecision::Retry { attempt: 2, delay: Duration::from_millis(200) }
/// );
/// assert_eq!(policy.next(), RetryDecision::GiveUp);
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_backoff: Duration,
    max_backoff: Option<Duration>,
    attempt: u32,
}

impl RetryPolicy {
    pub fn new(options: &FetchOptions) -> Self {
        Self {
            max_retries: options.max_retries,
            base_backoff: options.base_backoff,
            max_backoff: options.max_backoff,
            attempt: 0,
        }
    }

    /// Retries issued so far in this cycle.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Whether the next failure will be terminal.
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_retries
    }

    /// Record a failed attempt and decide what happens next.
    pub fn next(&mut self) -> RetryDecision {
        if self.is_exhausted() {
            return RetryDecision::GiveUp;
        }
        let delay = self.delay_for_attempt(self.attempt);
        self.attempt += 1;
        RetryDecision::Retry {
            attempt: self.attempt,
            delay,
        }
    }

    /// Delay before retry number `attempt + 1` (0-indexed).
    ///
    /// `base_backoff * 2^attempt` with saturating arithmetic, capped at
    /// `max_backoff` when one is set.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .base_backoff
            .saturating_mul(2u32.saturating_pow(attempt));
        match self.max_backoff {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_retries: u32, base_ms: u64) -> RetryPolicy {
        RetryPolicy::new(
            &FetchOptions::new()
                .max_retries(max_retries)
                .base_backoff(Duration::from_millis(base_ms)),
        )
    }

    #[test]
    fn delays_double_each_attempt() {
        let p = policy(5, 100);
        assert_eq!(p.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(p.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(p.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(p.delay_for_attempt(3), Duration::from_millis(800));
    }

    #[test]
    fn delay_capped_at_max_backoff() {
        let p = RetryPolicy::new(
            &FetchOptions::new()
                .base_backoff(Duration::from_secs(1))
                .max_backoff(Duration::from_secs(5)),
        );
        // 1s * 2^3 = 8s, capped at 5s
        assert_eq!(p.delay_for_attempt(3), Duration::from_secs(5));
    }

    #[test]
    fn delay_saturates_instead_of_overflowing() {
        let p = policy(100, 1_000);
        // 2^64 saturates to u32::MAX
        assert_eq!(
            p.delay_for_attempt(64),
            Duration::from_secs(u64::from(u32::MAX))
        );
    }

    #[test]
    fn exactly_max_retries_then_give_up() {
        let mut p = policy(3, 10);
        let mut delays = Vec::new();
        while let RetryDecision::Retry { delay, .. } = p.next() {
            delays.push(delay);
        }
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(40)
            ]
        );
        assert_eq!(p.attempt(), 3);
        assert!(p.is_exhausted());
        // Stays terminal.
        assert_eq!(p.next(), RetryDecision::GiveUp);
    }

    #[test]
    fn zero_retries_gives_up_immediately() {
        let mut p = policy(0, 10);
        assert!(p.is_exhausted());
        assert_eq!(p.next(), RetryDecision::GiveUp);
        assert_eq!(p.attempt(), 0);
    }
}
