//! Per-Call Deadlines

use monitoring_client::BackendError;
use std::future::Future;
use std::time::Duration;

/// Run a backend call under `deadline`; expiry becomes `BackendError::Timeout`
pub(crate) async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(deadline.as_millis() as u64)),
    }
}
