//! Deadline wrapper for module invocations

use edgerule_core::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// Await `future` for at most `timeout_ms` milliseconds.
///
/// On expiry the future is dropped and [`Error::Timeout`] is returned. The
/// timer is released on either outcome.
pub async fn time_bounded<F, T>(future: F, timeout_ms: u64) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(timeout_ms)),
    }
}
