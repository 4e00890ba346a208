use std::time::Duration;

use rand::Rng;

/// How failed uploads are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per item before it is reported as permanently failed.
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Delay before the first retry; doubled on every further failure.
    /// Zero retries immediately.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

    /// Retries forever without waiting.
    pub fn immediate() -> Self {
        RetryPolicy {
            max_attempts: None,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Whether an item that has been attempted `attempts` times may go again.
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }

    /// Delay before the next attempt, after `failures` consecutive failures.
    /// The exponential delay is jittered down to at most half its value.
    pub fn delay(&self, failures: u32) -> Duration {
        let ceiling = self.ceiling(failures);
        if ceiling.is_zero() {
            return ceiling;
        }

        let max_ms = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);
        let jittered_ms = rand::rng().random_range(max_ms / 2..=max_ms);
        Duration::from_millis(jittered_ms)
    }

    fn ceiling(&self, failures: u32) -> Duration {
        if failures == 0 || self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let factor = 1u32 << (failures - 1).min(16);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: None,
            base_delay: Self::DEFAULT_BASE_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
        }
    }
}
