use labelvote_common::{LabelVoteError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run `op` up to `max_attempts` times with exponential backoff
/// (`base_delay`, then doubling) between failed attempts.
pub(crate) async fn with_retry<T, F, Fut>(
    label: &str,
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt < max_attempts {
                    let delay = base_delay * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        "{} request failed (attempt {}/{}): {}. Retrying in {:?}...",
                        label, attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| LabelVoteError::provider(format!("{}: all retries failed", label))))
}
