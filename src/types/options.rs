//! Fetch options and their defaults

use std::time::Duration;

use crate::{HuginnError, Result};

/// Default cache validity window: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(1_000);

/// Options recognised by [`FetchController::trigger()`](crate::FetchController::trigger)
/// and [`FetchController::refetch()`](crate::FetchController::refetch).
///
/// ```rust
/// # use huginn::FetchOptions;
/// # use std::time::Duration;
/// let options = FetchOptions::new()
///     .ttl(Duration::from_secs(5))
///     .max_retries(2)
///     .base_backoff(Duration::from_millis(100));
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// How long a cached payload may be reused. Default: 300 000 ms.
    pub ttl: Duration,
    /// Retries after the initial attempt. 0 = no retry. Default: 3.
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further retry.
    /// Must be non-zero. Default: 1 000 ms.
    pub base_backoff: Duration,
    /// Upper bound on a single backoff delay. Default: uncapped.
    pub max_backoff: Option<Duration>,
    /// Whether a controller bound at build time starts resolving
    /// immediately. Default: true.
    pub auto_start: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_retries: DEFAULT_MAX_RETRIES,
            base_backoff: DEFAULT_BASE_BACKOFF,
            max_backoff: None,
            auto_start: true,
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn base_backoff(mut self, delay: Duration) -> Self {
        self.base_backoff = delay;
        self
    }

    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = Some(delay);
        self
    }

    pub fn auto_start(mut self, enabled: bool) -> Self {
        self.auto_start = enabled;
        self
    }

    /// Reject option combinations the controller cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.base_backoff.is_zero() {
            return Err(HuginnError::InvalidInput(
                "base backoff must be greater than zero".to_string(),
            ));
        }
        if self.max_backoff.is_some_and(|cap| cap < self.base_backoff) {
            return Err(HuginnError::InvalidInput(
                "max backoff must not be below the base backoff".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = FetchOptions::default();
        assert_eq!(options.ttl, Duration::from_millis(300_000));
        assert_eq!(options.max_retries, 3);
        assert_eq!(options.base_backoff, Duration::from_millis(1_000));
        assert_eq!(options.max_backoff, None);
        assert!(options.auto_start);
    }

    #[test]
    fn zero_backoff_rejected() {
        let options = FetchOptions::new().base_backoff(Duration::ZERO);
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("base backoff"));
    }

    #[test]
    fn cap_below_base_rejected() {
        let options = FetchOptions::new()
            .base_backoff(Duration::from_secs(2))
            .max_backoff(Duration::from_secs(1));
        assert!(options.validate().is_err());
    }
}
