//! Bounded immediate retry around [`EventSource::poll`].

use std::time::Duration;

use relay_types::{EventBatch, EventSource, SourceError};

/// Total poll attempts per cycle: the first try plus three retries.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 4;

/// What a retried poll ended with, and how many calls it took.
#[derive(Debug)]
pub struct PollResult {
    pub outcome: Result<Option<EventBatch>, SourceError>,
    pub attempts: u32,
}

/// Polls `stream`, retrying transient failures immediately until
/// `max_attempts` calls have been made. Any other error is returned on the
/// attempt that produced it. `max_attempts` below one is treated as one.
pub fn poll_with_retry<S>(
    source: &mut S,
    stream: &mut S::Stream,
    timeout: Duration,
    max_attempts: u32,
) -> PollResult
where
    S: EventSource + ?Sized,
{
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0;
    loop {
        attempts += 1;
        match source.poll(stream, timeout) {
            Err(e) if e.is_transient() && attempts < max_attempts => {
                tracing::debug!(attempt = attempts, error = %e, "poll for event batch failed, retrying");
            }
            Err(e) if e.is_transient() => {
                tracing::debug!(attempt = attempts, error = %e, "poll for event batch failed, reached max attempts");
                return PollResult {
                    outcome: Err(e),
                    attempts,
                };
            }
            outcome => return PollResult { outcome, attempts },
        }
    }
}
