//! Harness events and the sinks that consume them.
//!
//! The driver and its task units never log directly. They emit
//! [`HarnessEvent`]s to an [`EventSink`] handed to them at construction:
//! [`TracingSink`] for real runs, [`RecordingSink`] to assert on the exact
//! sequence of events in tests.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use lifestress_common::types::Phase;
use lifestress_runtime::error::RuntimeError;

use crate::report::PhaseReport;
use crate::task::{TaskOutcome, TaskTag};

/// Something that happened during a run.
#[derive(Debug, Clone)]
pub enum HarnessEvent {
    /// The driver is about to run its first iteration.
    RunStarted {
        /// Backend name.
        backend: &'static str,
        /// Task units per phase.
        count: usize,
        /// Number of iterations.
        iteration: usize,
        /// Task units a full run executes.
        expected_tasks: Option<usize>,
    },
    /// A new iteration begins (0-based).
    IterationStarted {
        /// Iteration index.
        iteration: usize,
    },
    /// A phase is about to fan out.
    PhaseStarted {
        /// Iteration index.
        iteration: usize,
        /// Phase being started.
        phase: Phase,
    },
    /// A task unit is about to acquire its handle.
    TaskStarted {
        /// Which task.
        task: TaskTag,
    },
    /// A lifecycle operation returned an error. The run continues.
    OperationFailed {
        /// Which task.
        task: TaskTag,
        /// The operation error.
        error: RuntimeError,
    },
    /// A handle could not be acquired. The run is being cancelled.
    AcquisitionFailed {
        /// Which task.
        task: TaskTag,
        /// The acquisition error.
        error: RuntimeError,
    },
    /// A task unit is done and about to signal the barrier.
    TaskFinished {
        /// Which task.
        task: TaskTag,
        /// How it ended.
        outcome: TaskOutcome,
    },
    /// Every unit of a phase has passed the barrier.
    PhaseCompleted {
        /// Tallies for the phase.
        report: PhaseReport,
    },
    /// The driver stopped early.
    RunCancelled {
        /// Iteration during which the run stopped.
        iteration: usize,
        /// Phase during which the run stopped.
        phase: Phase,
    },
    /// The driver returned.
    RunFinished {
        /// Task units executed.
        tasks: usize,
        /// Task units whose operation failed.
        failures: usize,
        /// Wall-clock duration of the run.
        elapsed: Duration,
    },
}

/// Receiver of harness events.
///
/// Sinks are shared by every concurrently running task unit.
pub trait EventSink: Send + Sync {
    /// Consumes one event.
    fn record(&self, event: &HarnessEvent);
}

/// Sink that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &HarnessEvent) {
        match event {
            HarnessEvent::RunStarted {
                backend,
                count,
                iteration,
                expected_tasks,
            } => tracing::info!(backend, count, iteration, expected_tasks = ?expected_tasks, "stress run starting"),
            HarnessEvent::IterationStarted { iteration } => {
                tracing::debug!(iteration = iteration + 1, "-- iteration --");
            }
            HarnessEvent::PhaseStarted { iteration, phase } => {
                tracing::debug!(iteration = iteration + 1, %phase, "-- phase --");
            }
            HarnessEvent::TaskStarted { task } => {
                tracing::debug!(id = %task.id, phase = %task.phase, "{}", progress_verb(task.phase));
            }
            HarnessEvent::OperationFailed { task, error } => {
                tracing::error!(iteration = task.iteration + 1, id = %task.id, phase = %task.phase, %error, "operation failed");
            }
            HarnessEvent::AcquisitionFailed { task, error } => {
                tracing::error!(iteration = task.iteration + 1, id = %task.id, phase = %task.phase, %error, "cannot acquire container, aborting run");
            }
            HarnessEvent::TaskFinished { task, outcome } => {
                tracing::trace!(id = %task.id, phase = %task.phase, outcome = outcome.as_str(), "task finished");
            }
            HarnessEvent::PhaseCompleted { report } => tracing::debug!(
                iteration = report.iteration + 1,
                phase = %report.phase,
                succeeded = report.succeeded,
                failed = report.failed,
                elapsed_ms = report.elapsed.as_millis(),
                "phase complete"
            ),
            HarnessEvent::RunCancelled { iteration, phase } => {
                tracing::warn!(iteration = iteration + 1, %phase, "run cancelled, no further phases will run");
            }
            HarnessEvent::RunFinished {
                tasks,
                failures,
                elapsed,
            } => tracing::info!(tasks, failures, elapsed_ms = elapsed.as_millis(), "stress run finished"),
        }
    }
}

const fn progress_verb(phase: Phase) -> &'static str {
    match phase {
        Phase::Create => "creating the container",
        Phase::Start => "starting the container",
        Phase::Stop => "stopping the container",
        Phase::Destroy => "destroying the container",
    }
}

/// Sink that keeps every event in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<HarnessEvent>>,
}

impl RecordingSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<HarnessEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the tags of all started tasks, in start order.
    #[must_use]
    pub fn started(&self) -> Vec<TaskTag> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HarnessEvent::TaskStarted { task } => Some(task),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: &HarnessEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use lifestress_common::types::ContainerId;

    use super::*;

    fn tag(id: usize) -> TaskTag {
        TaskTag {
            iteration: 0,
            phase: Phase::Create,
            id: ContainerId::new(id),
        }
    }

    #[test]
    fn recording_sink_keeps_arrival_order() {
        let sink = RecordingSink::new();
        sink.record(&HarnessEvent::TaskStarted { task: tag(1) });
        sink.record(&HarnessEvent::IterationStarted { iteration: 0 });
        sink.record(&HarnessEvent::TaskStarted { task: tag(0) });

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.started(), vec![tag(1), tag(0)]);
    }

    #[test]
    fn tracing_sink_accepts_every_event() {
        let sink = TracingSink;
        sink.record(&HarnessEvent::TaskFinished {
            task: tag(0),
            outcome: TaskOutcome::Succeeded,
        });
        sink.record(&HarnessEvent::RunStarted {
            backend: "simulated",
            count: 2,
            iteration: 1,
            expected_tasks: Some(8),
        });
        sink.record(&HarnessEvent::RunFinished {
            tasks: 0,
            failures: 0,
            elapsed: Duration::ZERO,
        });
    }
}
