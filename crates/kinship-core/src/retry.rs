//! Bounded retry with a fixed delay
//!
//! Used where a miss is expected to be temporary, such as reading a
//! breadcrumb the host has not rendered yet.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Run `operation` until it yields `Some`, at most `max_attempts` times,
/// sleeping `delay` between attempts. Returns `None` once attempts run out.
pub async fn retry_fixed<F, Fut, T>(max_attempts: u32, delay: Duration, mut operation: F) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=max_attempts {
        if let Some(value) = operation(attempt).await {
            return Some(value);
        }
        if attempt < max_attempts {
            debug!("Attempt {} of {} missed, retrying in {:?}", attempt, max_attempts, delay);
            tokio::time::sleep(delay).await;
        }
    }
    None
}
