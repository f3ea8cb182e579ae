//! Retry policy for model requests
//!
//! Exponential backoff with a cap and a little jitter.

use std::time::Duration;

use rand::Rng;

use crate::core::config::ModelConfig;

/// Bounded retry schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Upper bound for any delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.backoff_max_ms),
        }
    }

    /// Policy that never waits, for tests and one-shot calls
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay without jitter after the given failed attempt (1-based)
    pub fn base_delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    /// Delay with up to 10% jitter, still capped
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let base = self.base_delay_after(attempt);
        if base.is_zero() {
            return base;
        }
        let jitter_ms = rand::rng().random_range(0..=base.as_millis() as u64 / 10);
        (base + Duration::from_millis(jitter_ms)).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ModelConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_exponential_growth_with_cap() {
        let p = policy();
        assert_eq!(p.base_delay_after(1), Duration::from_millis(100));
        assert_eq!(p.base_delay_after(2), Duration::from_millis(200));
        assert_eq!(p.base_delay_after(3), Duration::from_millis(400));
        assert_eq!(p.base_delay_after(4), Duration::from_millis(500));
        assert_eq!(p.base_delay_after(40), Duration::from_millis(500));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let p = policy();
        for _ in 0..50 {
            let d = p.delay_after(2);
            assert!(d >= Duration::from_millis(200) && d <= Duration::from_millis(220));
        }
    }

    #[test]
    fn test_immediate() {
        let p = RetryPolicy::immediate(0);
        assert_eq!(p.max_attempts, 1);
        assert!(p.delay_after(3).is_zero());
    }
}
