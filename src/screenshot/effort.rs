use std::future::Future;
use tracing::{trace, warn};

use crate::screenshot::error::CaptureError;

/// Runs an operation whose failure must never fail the capture.
///
/// Failures are logged at `warn` and reported as `None`; the caller decides whether
/// the missing value matters. This is the only place the pipeline swallows errors.
pub async fn best_effort<T, F>(label: &str, operation: F) -> Option<T>
where
    F: Future<Output = Result<T, CaptureError>>,
{
    match operation.await {
        Ok(value) => {
            trace!("Best-effort step {} succeeded", label);
            Some(value)
        }
        Err(e) => {
            warn!("Best-effort step {} failed, continuing: {}", label, e);
            None
        }
    }
}
