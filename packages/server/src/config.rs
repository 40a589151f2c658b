//! Routing configuration.
//!
//! Every component receives its configuration explicitly at construction time;
//! the server binary builds a [`RoutingConfig`] from command line arguments.

use std::time::Duration;

use clap::ValueEnum;

/// What a producer experiences when a connection's delivery queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackpressurePolicy {
    /// Wait for free space, bounded by the transport timeout
    #[default]
    Block,
    /// Evict the oldest queued item to make room
    DropOldest,
    /// Refuse the new item
    Reject,
}

/// What happens to a message whose recipient has no live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OfflinePolicy {
    /// Keep the message pending and deliver it when the recipient reconnects
    #[default]
    PersistAndRetry,
    /// Mark the message failed immediately
    Fail,
}

/// Exponential backoff for store operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (at least 1)
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff to wait after the given (1-based) failed attempt
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        let millis = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(millis.min(self.max_backoff.as_millis() as f64) as u64)
    }
}

/// Configuration of the routing core
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingConfig {
    /// Capacity of each per-connection delivery queue
    pub queue_capacity: usize,
    pub backpressure: BackpressurePolicy,
    pub offline_policy: OfflinePolicy,
    /// Upper bound of a single store operation attempt
    pub store_timeout: Duration,
    /// Upper bound of a single frame send, and of a blocked enqueue
    pub transport_timeout: Duration,
    pub retry: RetryPolicy,
    /// A connection with no inbound traffic for this long is torn down
    pub idle_timeout: Duration,
    /// How many recently delivered message ids each writer remembers
    pub dedup_window: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            backpressure: BackpressurePolicy::default(),
            offline_policy: OfflinePolicy::default(),
            store_timeout: Duration::from_secs(2),
            transport_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            idle_timeout: Duration::from_secs(300),
            dedup_window: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_exponentially_up_to_max() {
        // テスト項目: バックオフは指数的に増加し、上限で頭打ちになる
        // given (前提条件):
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
            multiplier: 2.0,
        };

        // when (操作):
        let delays: Vec<u128> = (1..=5)
            .map(|attempt| policy.backoff_after(attempt).as_millis())
            .collect();

        // then (期待する結果):
        assert_eq!(delays, vec![100, 200, 400, 500, 500]);
    }
}
