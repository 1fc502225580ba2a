//! Triggers poll cycles one after another.
//!
//! Each cycle runs on a blocking thread. The [`PollLoop`] is moved into the
//! blocking closure and handed back when the cycle finishes, so at most one
//! cycle exists at a time and the loop itself needs no lock.

use std::sync::Arc;

use relay_core::{CycleReport, PollLoop};
use relay_types::{CheckpointStore, EventSource, RecordSink};
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::AppState;

/// Pauses between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Wait after a cycle that completed.
    pub interval: Duration,
    /// Wait after a cycle that failed.
    pub yield_after_failure: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            interval: Duration::ZERO,
            yield_after_failure: Duration::from_secs(1),
        }
    }
}

/// Runs one cycle on a blocking thread and records its outcome in
/// `state.status`.
///
/// Returns the loop back together with the cycle result. `None` means the
/// blocking task panicked; the loop is lost with it.
pub async fn run_scheduled_cycle<Src, Snk, St>(
    state: &AppState,
    mut relay: PollLoop<Src, Snk, St>,
) -> Option<(PollLoop<Src, Snk, St>, Result<CycleReport, String>)>
where
    Src: EventSource + Send + 'static,
    Snk: RecordSink + Send + 'static,
    St: CheckpointStore + Send + 'static,
{
    let cycle_id = Uuid::new_v4();
    let span = tracing::info_span!("poll_cycle", %cycle_id);

    let joined = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        let result = relay.run_cycle().map_err(|e| {
            tracing::error!(error = %e, "poll cycle failed");
            e.to_string()
        });
        (relay, result)
    })
    .await;

    match joined {
        Ok((relay, result)) => {
            match state.status.write() {
                Ok(mut status) => match &result {
                    Ok(report) => status.record_report(report),
                    Err(e) => status.record_failure(e),
                },
                Err(_) => tracing::warn!("cycle status lock poisoned; status not updated"),
            }
            Some((relay, result))
        }
        Err(e) => {
            tracing::error!(%cycle_id, "poll cycle task join error: {}", e);
            if let Ok(mut status) = state.status.write() {
                status.record_stopped(&format!("cycle task aborted: {e}"));
            }
            None
        }
    }
}

/// Starts the poll task.
///
/// Runs until the relay is lost to a panicked cycle. Cycles never overlap:
/// the next one is only triggered after the previous one has returned and
/// the schedule's pause has elapsed.
pub async fn start_poll_task<Src, Snk, St>(
    state: Arc<AppState>,
    relay: PollLoop<Src, Snk, St>,
    schedule: Schedule,
) where
    Src: EventSource + Send + 'static,
    Snk: RecordSink + Send + 'static,
    St: CheckpointStore + Send + 'static,
{
    tracing::info!(
        interval_ms = schedule.interval.as_millis() as u64,
        yield_ms = schedule.yield_after_failure.as_millis() as u64,
        watch_path = %relay.settings().filter.watch_path,
        "starting poll task"
    );

    let mut relay = relay;
    loop {
        let Some((next, result)) = run_scheduled_cycle(&state, relay).await else {
            tracing::error!("poll task stopped");
            return;
        };
        relay = next;

        let pause = if result.is_ok() {
            schedule.interval
        } else {
            schedule.yield_after_failure
        };
        sleep(pause).await;
    }
}
