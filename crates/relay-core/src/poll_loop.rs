//! The checkpointed poll, filter, emit cycle.
//!
//! A cycle moves through four stages:
//!
//! 1. **Load** the checkpoint. Failure aborts the cycle before anything else.
//! 2. **Open and poll** the source at that position, retrying transient poll
//!    failures up to [`LoopSettings::max_poll_attempts`] calls in total. A
//!    history gap resets the position to the tip and skips stage 3.
//! 3. **Filter and emit** each event of the batch, in batch order.
//! 4. **Advance and persist** the batch's terminal txid (or the tip after a
//!    gap). A failed write is logged and does not fail the cycle.
//!
//! Stages 2 and 3 are [`PollLoop::step`], which takes a position and returns
//! the next one without touching the store. [`PollLoop::run_cycle`] wraps it
//! with stages 1 and 4. The loop holds no position of its own between
//! cycles and does no locking; callers must not run cycles concurrently.

use std::time::Duration;

use relay_types::{
    CheckpointPosition, CheckpointStore, EventBatch, EventSource, RecordSink, Scope, SourceError,
};

use crate::checkpoint::{load_position, persist_position};
use crate::error::CycleError;
use crate::filter::FilterConfig;
use crate::retry::{poll_with_retry, DEFAULT_POLL_ATTEMPTS};
use crate::serializer::to_record;

/// Tunables for one [`PollLoop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSettings {
    /// Upper bound on each blocking poll call.
    pub poll_duration: Duration,
    /// Total poll calls per cycle before a transient failure becomes fatal.
    pub max_poll_attempts: u32,
    /// State-map scope the checkpoint lives in.
    pub scope: Scope,
    pub filter: FilterConfig,
}

impl LoopSettings {
    pub fn new(filter: FilterConfig) -> Self {
        Self {
            poll_duration: Duration::from_secs(1),
            max_poll_attempts: DEFAULT_POLL_ATTEMPTS,
            scope: Scope::Cluster,
            filter,
        }
    }

    pub fn poll_duration(mut self, poll_duration: Duration) -> Self {
        self.poll_duration = poll_duration;
        self
    }
}

/// How the position moved during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// A batch (possibly empty) was processed up to this terminal txid.
    Batch { txid: i64 },
    /// The poll elapsed with nothing ready; the position is unchanged.
    Idle,
    /// History at the resume point was pruned; the position is now the tip.
    /// Events that only existed in the pruned window are lost.
    GapReset,
}

/// Result of [`PollLoop::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Where the next cycle should resume.
    pub position: CheckpointPosition,
    pub advance: Advance,
    /// Records handed to the sink.
    pub emitted: usize,
    /// Events the filter rejected.
    pub skipped: usize,
    /// Poll calls made, retries included.
    pub poll_attempts: u32,
}

/// Result of [`PollLoop::run_cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Position the cycle started from.
    pub previous: CheckpointPosition,
    /// Position the cycle ended at. Durable only if `persisted` is true.
    pub position: CheckpointPosition,
    pub advance: Advance,
    pub emitted: usize,
    pub skipped: usize,
    pub poll_attempts: u32,
    /// Whether the checkpoint write succeeded. Idle cycles write nothing
    /// and report false.
    pub persisted: bool,
}

/// Drives cycles against one source, sink, and checkpoint store.
pub struct PollLoop<Src, Snk, St> {
    source: Src,
    sink: Snk,
    store: St,
    settings: LoopSettings,
}

impl<Src, Snk, St> PollLoop<Src, Snk, St>
where
    Src: EventSource,
    Snk: RecordSink,
    St: CheckpointStore,
{
    pub fn new(source: Src, sink: Snk, store: St, settings: LoopSettings) -> Self {
        Self {
            source,
            sink,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn source(&self) -> &Src {
        &self.source
    }

    pub fn sink(&self) -> &Snk {
        &self.sink
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub fn into_parts(self) -> (Src, Snk, St) {
        (self.source, self.sink, self.store)
    }

    /// Runs one full cycle: load, step, persist.
    ///
    /// # Errors
    ///
    /// Returns `CycleError` when the checkpoint cannot be read or the step
    /// fails. In both cases the persisted checkpoint is untouched. A failed
    /// checkpoint write is not an error; see [`CycleReport::persisted`].
    pub fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        let scope = self.settings.scope;
        let previous = load_position(&self.store, scope).map_err(CycleError::LoadCheckpoint)?;

        let step = self.step(previous)?;

        let persisted = match step.advance {
            Advance::Idle => false,
            Advance::Batch { .. } | Advance::GapReset => {
                match persist_position(&self.store, scope, step.position) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(
                            position = %step.position,
                            error = %e,
                            "failed to update state for last transaction id; events may be emitted again after a restart"
                        );
                        false
                    }
                }
            }
        };

        tracing::info!(
            previous = %previous,
            position = %step.position,
            emitted = step.emitted,
            skipped = step.skipped,
            poll_attempts = step.poll_attempts,
            persisted,
            "cycle complete"
        );

        Ok(CycleReport {
            previous,
            position: step.position,
            advance: step.advance,
            emitted: step.emitted,
            skipped: step.skipped,
            poll_attempts: step.poll_attempts,
            persisted,
        })
    }

    /// Opens the stream at `position`, polls one batch, and emits the
    /// accepted events. Returns the position to persist; never writes it.
    ///
    /// # Errors
    ///
    /// Returns `CycleError` if the stream cannot be opened, every poll
    /// attempt fails transiently, the source breaks protocol or delivers an
    /// unknown kind, or an accepted event cannot be serialised or emitted.
    pub fn step(&mut self, position: CheckpointPosition) -> Result<StepOutcome, CycleError> {
        let mut stream = match self.source.open_stream(position) {
            Ok(stream) => stream,
            Err(SourceError::Gap(detail)) => return Ok(gap_reset(position, &detail, 0)),
            Err(source) => return Err(CycleError::OpenStream { position, source }),
        };

        let polled = poll_with_retry(
            &mut self.source,
            &mut stream,
            self.settings.poll_duration,
            self.settings.max_poll_attempts,
        );
        let attempts = polled.attempts;

        let batch = match polled.outcome {
            Ok(Some(batch)) => batch,
            Ok(None) => {
                tracing::debug!(position = %position, "no events ready before poll timeout");
                return Ok(StepOutcome {
                    position,
                    advance: Advance::Idle,
                    emitted: 0,
                    skipped: 0,
                    poll_attempts: attempts,
                });
            }
            Err(SourceError::Gap(detail)) => return Ok(gap_reset(position, &detail, attempts)),
            Err(source) if source.is_transient() => {
                return Err(CycleError::PollExhausted { attempts, source })
            }
            Err(source) => return Err(CycleError::from_source(source)),
        };

        let (emitted, skipped) = self.emit_batch(&batch)?;

        if let Some(previous) = position.txid() {
            if batch.txid < previous {
                tracing::warn!(
                    previous,
                    txid = batch.txid,
                    "source returned a batch behind the checkpoint"
                );
            }
        }

        Ok(StepOutcome {
            position: CheckpointPosition::from_txid(batch.txid),
            advance: Advance::Batch { txid: batch.txid },
            emitted,
            skipped,
            poll_attempts: attempts,
        })
    }

    fn emit_batch(&mut self, batch: &EventBatch) -> Result<(usize, usize), CycleError> {
        let mut emitted = 0;
        let mut skipped = 0;
        for event in &batch.events {
            if !self.settings.filter.accepts(event) {
                skipped += 1;
                continue;
            }
            let record = to_record(event)?;
            tracing::debug!(
                event_type = %record.event_type,
                event_path = %record.event_path,
                "emitting record for event"
            );
            self.sink.emit(&record)?;
            emitted += 1;
        }
        Ok((emitted, skipped))
    }
}

fn gap_reset(position: CheckpointPosition, detail: &str, attempts: u32) -> StepOutcome {
    tracing::error!(
        position = %position,
        detail,
        "notification history missing at resume point; resetting to the current tip, events in the gap will not be emitted"
    );
    StepOutcome {
        position: CheckpointPosition::Tip,
        advance: Advance::GapReset,
        emitted: 0,
        skipped: 0,
        poll_attempts: attempts,
    }
}
