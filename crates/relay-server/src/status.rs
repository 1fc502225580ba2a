//! In-memory snapshot of the poll loop's progress, served by `/api/status`.

use chrono::{DateTime, Utc};
use relay_core::{Advance, CycleReport};
use serde::Serialize;

/// How the most recent cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LastOutcome {
    NotRun,
    Advanced { txid: i64 },
    Idle,
    GapReset,
    Failed { error: String },
    /// The cycle task panicked and the poll task has exited.
    Stopped { error: String },
}

/// Counters and last-cycle details.
#[derive(Debug, Clone, Serialize)]
pub struct CycleStatus {
    /// Position after the last successful cycle, in its persisted form
    /// (`-1` for the tip). `None` until a cycle has completed.
    pub position: Option<i64>,
    /// Whether that position was written to the state store.
    pub persisted: bool,
    pub last_outcome: LastOutcome,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub cycles: u64,
    pub records_emitted: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
    pub gap_resets: u64,
}

impl Default for CycleStatus {
    fn default() -> Self {
        Self {
            position: None,
            persisted: false,
            last_outcome: LastOutcome::NotRun,
            last_cycle_at: None,
            cycles: 0,
            records_emitted: 0,
            failures: 0,
            consecutive_failures: 0,
            gap_resets: 0,
        }
    }
}

impl CycleStatus {
    pub fn record_report(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.consecutive_failures = 0;
        self.records_emitted += report.emitted as u64;
        self.position = Some(report.position.txid().unwrap_or(-1));
        self.persisted = report.persisted;
        self.last_outcome = match report.advance {
            Advance::Batch { txid } => LastOutcome::Advanced { txid },
            Advance::Idle => LastOutcome::Idle,
            Advance::GapReset => {
                self.gap_resets += 1;
                LastOutcome::GapReset
            }
        };
        self.last_cycle_at = Some(Utc::now());
    }

    pub fn record_failure(&mut self, error: &str) {
        self.cycles += 1;
        self.failures += 1;
        self.consecutive_failures += 1;
        self.last_outcome = LastOutcome::Failed {
            error: error.to_string(),
        };
        self.last_cycle_at = Some(Utc::now());
    }

    /// Marks the poll task as gone. No further cycles will run.
    pub fn record_stopped(&mut self, error: &str) {
        self.record_failure(error);
        self.last_outcome = LastOutcome::Stopped {
            error: error.to_string(),
        };
    }

    pub fn poller_stopped(&self) -> bool {
        matches!(self.last_outcome, LastOutcome::Stopped { .. })
    }
}
