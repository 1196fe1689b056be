//! Bounded waits on collaborator calls.

use std::future::Future;
use std::time::Duration;

use tracing::error;

use crate::error::{RagError, Result};

/// Await `call`, failing with the error built by `on_timeout` if it does not
/// complete within `limit`.
///
/// A call that times out has an unknown outcome: the collaborator may still
/// have applied it.
pub(crate) async fn bounded<T, F>(
    limit: Duration,
    operation: &'static str,
    call: F,
    on_timeout: impl FnOnce(String) -> RagError,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            error!(operation, timeout_ms = limit.as_millis() as u64, "upstream call timed out");
            Err(on_timeout(format!("{operation} timed out after {}ms", limit.as_millis())))
        }
    }
}
