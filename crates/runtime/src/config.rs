//! Runtime tuning knobs.

use std::time::Duration;

/// Configuration for an [`crate::ActorRuntime`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Commands queued per key before dispatch returns `Busy`.
    pub mailbox_capacity: usize,

    /// How long an actor may sit idle before its mailbox task exits and its
    /// cached state is dropped. Reactivation is transparent to callers.
    pub idle_timeout: Duration,

    /// How many times a version conflict is retried (reload + re-decide)
    /// before the actor is quarantined.
    pub conflict_retries: u32,

    /// Attempts against an unavailable entity store before surfacing
    /// `Unavailable`.
    pub store_retry_attempts: u32,

    /// Base delay for store retry backoff; doubles per attempt.
    pub store_retry_base: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 32,
            idle_timeout: Duration::from_secs(300),
            conflict_retries: 3,
            store_retry_attempts: 4,
            store_retry_base: Duration::from_millis(50),
        }
    }
}

impl RuntimeConfig {
    /// Sets the per-key mailbox capacity.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    /// Sets the idle eviction timeout.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the bounded conflict retry count.
    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    /// Sets the store retry budget.
    pub fn with_store_retries(mut self, attempts: u32, base: Duration) -> Self {
        self.store_retry_attempts = attempts;
        self.store_retry_base = base;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = RuntimeConfig::default();
        assert_eq!(config.mailbox_capacity, 32);
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.conflict_retries, 3);
    }

    #[test]
    fn builder_overrides() {
        let config = RuntimeConfig::default()
            .with_mailbox_capacity(4)
            .with_idle_timeout(Duration::from_millis(100))
            .with_conflict_retries(1)
            .with_store_retries(2, Duration::from_millis(5));

        assert_eq!(config.mailbox_capacity, 4);
        assert_eq!(config.idle_timeout, Duration::from_millis(100));
        assert_eq!(config.conflict_retries, 1);
        assert_eq!(config.store_retry_attempts, 2);
        assert_eq!(config.store_retry_base, Duration::from_millis(5));
    }
}
