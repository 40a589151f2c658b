//! Bounded, retried store operations.

use std::{future::Future, time::Duration};

use crate::{config::RetryPolicy, domain::StoreError};

use super::error::RoutingError;

/// Run a store operation with a per-attempt timeout and exponential backoff.
///
/// Timed-out attempts count as [`StoreError::Timeout`]. Non-retryable errors
/// are surfaced immediately. After the last attempt a timeout becomes
/// [`RoutingError::Timeout`] and anything else [`RoutingError::Store`].
pub async fn with_store_retry<T, F, Fut>(
    operation: &'static str,
    timeout: Duration,
    policy: &RetryPolicy,
    mut f: F,
) -> Result<T, RoutingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match tokio::time::timeout(timeout, f()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => StoreError::Timeout,
        };

        if !error.is_retryable() || attempt >= attempts {
            tracing::warn!(
                "{} failed after {} attempt(s): {}",
                operation,
                attempt,
                error
            );
            return Err(match error {
                StoreError::Timeout => RoutingError::Timeout {
                    operation,
                    attempts: attempt,
                },
                source => RoutingError::Store { operation, source },
            });
        }

        let delay = policy.backoff_after(attempt);
        tracing::debug!(
            "{} attempt {}/{} failed ({}), retrying in {:?}",
            operation,
            attempt,
            attempts,
            error,
            delay
        );
        tokio::time::sleep(delay).await;
    }
}
