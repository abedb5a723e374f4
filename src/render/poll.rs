use std::future::Future;
use std::time::Duration;

use crate::domain::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Found(T),
    TimedOut,
}

/// Run `check` every `interval`, at most `max_attempts` times, until it yields a value.
///
/// Each attempt waits one interval first, so a page gets time to start loading
/// before the first look. A failed check ends the poll immediately.
pub async fn poll_until<T, F, Fut>(
    interval: Duration,
    max_attempts: u32,
    mut check: F,
) -> Result<PollOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for _ in 0..max_attempts {
        tokio::time::sleep(interval).await;
        if let Some(value) = check().await? {
            return Ok(PollOutcome::Found(value));
        }
    }
    Ok(PollOutcome::TimedOut)
}
