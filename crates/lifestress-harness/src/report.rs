//! Per-phase tallies and the run report.

use std::time::Duration;

use lifestress_common::types::Phase;
use lifestress_runtime::error::RuntimeError;

use crate::error::HarnessError;
use crate::task::{TaskOutcome, TaskTag};

/// Outcome counts for one phase of one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    /// Iteration index (0-based).
    pub iteration: usize,
    /// Phase these counts belong to.
    pub phase: Phase,
    /// Task units handed to the scheduler.
    pub launched: usize,
    /// Units whose operation succeeded.
    pub succeeded: usize,
    /// Units whose operation failed.
    pub failed: usize,
    /// Units that could not acquire a handle.
    pub fatal: usize,
    /// Units never run because the run was cancelled, launched or not.
    pub skipped: usize,
    /// Units that unwound without an outcome.
    pub panicked: usize,
    /// Time from fan-out to barrier release.
    pub elapsed: Duration,
}

impl PhaseReport {
    /// Creates an empty tally.
    #[must_use]
    pub const fn new(iteration: usize, phase: Phase) -> Self {
        Self {
            iteration,
            phase,
            launched: 0,
            succeeded: 0,
            failed: 0,
            fatal: 0,
            skipped: 0,
            panicked: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Counts one outcome.
    pub const fn record(&mut self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Succeeded => self.succeeded += 1,
            TaskOutcome::Failed(_) => self.failed += 1,
            TaskOutcome::Fatal(_) => self.fatal += 1,
            TaskOutcome::Skipped => self.skipped += 1,
            TaskOutcome::Panicked => self.panicked += 1,
        }
    }

    /// Units that actually ran (everything but skipped ones).
    #[must_use]
    pub const fn executed(&self) -> usize {
        self.succeeded + self.failed + self.fatal + self.panicked
    }

    /// Units whose operation did not succeed, excluding the fatal path.
    #[must_use]
    pub const fn failures(&self) -> usize {
        self.failed + self.panicked
    }
}

/// How the run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Every phase of every iteration ran.
    Completed,
    /// A handle acquisition failed and the run stopped after draining the phase.
    Aborted {
        /// Task whose acquisition failed.
        task: TaskTag,
        /// The acquisition error.
        error: RuntimeError,
    },
    /// The run was cancelled from outside.
    Interrupted,
}

/// Everything a run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// RFC 3339 timestamp of the start of the run.
    pub started_at: String,
    /// Backend the run drove.
    pub backend: &'static str,
    /// Task units a full run would execute, if that count fits in a `usize`.
    pub expected_tasks: Option<usize>,
    /// Phase tallies in execution order.
    pub phases: Vec<PhaseReport>,
    /// Wall-clock duration.
    pub elapsed: Duration,
    /// How the run ended.
    pub termination: Termination,
}

impl RunReport {
    /// Starts an empty report stamped with the current time.
    #[must_use]
    pub fn begin(backend: &'static str) -> Self {
        Self {
            started_at: chrono::Utc::now().to_rfc3339(),
            backend,
            expected_tasks: None,
            phases: Vec::new(),
            elapsed: Duration::ZERO,
            termination: Termination::Completed,
        }
    }

    /// Task units that ran across all phases.
    #[must_use]
    pub fn total_tasks(&self) -> usize {
        self.phases.iter().map(PhaseReport::executed).sum()
    }

    /// Task units whose lifecycle operation failed.
    #[must_use]
    pub fn total_failures(&self) -> usize {
        self.phases.iter().map(PhaseReport::failures).sum()
    }

    /// Tally for one phase of one iteration, if it ran.
    #[must_use]
    pub fn phase(&self, iteration: usize, phase: Phase) -> Option<&PhaseReport> {
        self.phases
            .iter()
            .find(|p| p.iteration == iteration && p.phase == phase)
    }

    /// Turns the report into the run's verdict.
    ///
    /// Operation failures only count against the run in `strict` mode.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Aborted`] or [`HarnessError::Interrupted`] if
    /// the run stopped early, and [`HarnessError::StrictFailures`] if
    /// `strict` is set and any operation failed.
    pub fn verdict(&self, strict: bool) -> Result<(), HarnessError> {
        match &self.termination {
            Termination::Aborted { task, error } => Err(HarnessError::Aborted {
                task: *task,
                source: error.clone(),
            }),
            Termination::Interrupted => Err(HarnessError::Interrupted {
                completed_phases: self.phases.len(),
            }),
            Termination::Completed => match self.total_failures() {
                failures if strict && failures > 0 => Err(HarnessError::StrictFailures { failures }),
                _ => Ok(()),
            },
        }
    }
}
