use std::time::Duration;

use super::ErrorKind;

/// Retries for read-only queries
pub const QUERY_MAX_RETRIES: u32 = 2;

/// Retries for mutating calls
pub const MUTATION_MAX_RETRIES: u32 = 1;

/// Initial delay before a retry.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Upper bound for exponential query backoff.
pub const DEFAULT_RETRY_CEILING_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    Exponential { ceiling: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Two retries, `base * 2^attempt` capped at `ceiling`
    pub fn query(base_delay: Duration, ceiling: Duration) -> Self {
        Self {
            max_retries: QUERY_MAX_RETRIES,
            base_delay,
            backoff: Backoff::Exponential { ceiling },
        }
    }

    /// One retry after a fixed delay
    pub fn mutation(base_delay: Duration) -> Self {
        Self {
            max_retries: MUTATION_MAX_RETRIES,
            base_delay,
            backoff: Backoff::Fixed,
        }
    }

    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential { ceiling } => {
                let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor).min(ceiling)
            }
        }
    }

    /// Delay before the next attempt, or `None` to give up.
    /// Unauthorized is never retried.
    pub fn next_delay(&self, attempt: u32, kind: ErrorKind) -> Option<Duration> {
        if kind == ErrorKind::Unauthorized || attempt >= self.max_retries {
            None
        } else {
            Some(self.delay_for(attempt))
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::query(
            Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            Duration::from_millis(DEFAULT_RETRY_CEILING_MS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::query(Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(4), Duration::from_secs(16));
        assert_eq!(policy.delay_for(5), Duration::from_secs(30));
        assert_eq!(policy.delay_for(40), Duration::from_secs(30));
    }

    #[test]
    fn test_query_gives_up_after_two_retries() {
        let policy = RetryPolicy::default();
        assert!(policy.next_delay(0, ErrorKind::ServerError).is_some());
        assert!(policy.next_delay(1, ErrorKind::NetworkError).is_some());
        assert_eq!(policy.next_delay(2, ErrorKind::ServerError), None);
    }

    #[test]
    fn test_mutation_retries_once_with_fixed_delay() {
        let policy = RetryPolicy::mutation(Duration::from_millis(1000));
        assert_eq!(
            policy.next_delay(0, ErrorKind::Unknown),
            Some(Duration::from_millis(1000))
        );
        assert_eq!(policy.next_delay(1, ErrorKind::Unknown), None);
    }

    #[test]
    fn test_unauthorized_is_never_retried() {
        let query = RetryPolicy::default();
        let mutation = RetryPolicy::mutation(Duration::from_millis(1000));
        assert_eq!(query.next_delay(0, ErrorKind::Unauthorized), None);
        assert_eq!(mutation.next_delay(0, ErrorKind::Unauthorized), None);
    }

    #[test]
    fn test_none_policy() {
        assert_eq!(RetryPolicy::none().next_delay(0, ErrorKind::ServerError), None);
    }
}
