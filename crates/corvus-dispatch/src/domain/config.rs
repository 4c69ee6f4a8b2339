//! Dispatch layer configuration.

use crate::DEFAULT_INBOUND_CAPACITY;
use std::time::Duration;

/// Tunables of the dispatch core.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// How long an outbound request may stay pending before the sweeper
    /// fails it with `Timeout`.
    pub request_timeout: Duration,
    /// Grace period after a shutdown signal during which in-flight work may
    /// still complete before remaining entries are cancelled.
    pub shutdown_grace: Duration,
    /// Bound of the inbound hand-off queue.
    pub inbound_queue_capacity: usize,
    /// Upper bound on event-loop idle latency: the loop wakes at least this
    /// often to sweep for timeouts. Sweep granularity is therefore bounded
    /// by iteration latency, an accepted imprecision.
    pub tick_interval: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(2),
            shutdown_grace: Duration::from_secs(1),
            inbound_queue_capacity: DEFAULT_INBOUND_CAPACITY,
            tick_interval: Duration::from_millis(25),
        }
    }
}

impl DispatchConfig {
    /// Reject configurations the event loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inbound_queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("inbound queue capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("request timeout must be non-zero")]
    ZeroRequestTimeout,

    #[error("tick interval must be non-zero")]
    ZeroTickInterval,
}
