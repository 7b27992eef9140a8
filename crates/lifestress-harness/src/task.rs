//! Task units: one lifecycle operation against one container.

use std::fmt;
use std::sync::Arc;

use lifestress_common::types::{ContainerId, Phase};
use lifestress_runtime::backend::{self, ContainerRuntime};
use lifestress_runtime::error::RuntimeError;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::barrier::PhaseBarrier;
use crate::event::{EventSink, HarnessEvent};

/// Position of a task unit within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskTag {
    /// Iteration index (0-based).
    pub iteration: usize,
    /// Phase the unit belongs to.
    pub phase: Phase,
    /// Container the unit operates on.
    pub id: ContainerId,
}

impl fmt::Display for TaskTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iteration {} {} container {}",
            self.iteration + 1,
            self.phase,
            self.id
        )
    }
}

/// How a task unit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The operation succeeded.
    Succeeded,
    /// The operation failed; the run continues.
    Failed(RuntimeError),
    /// No handle could be acquired; the run is cancelled.
    Fatal(RuntimeError),
    /// The run was already cancelled when the unit was scheduled.
    Skipped,
    /// The unit unwound before producing an outcome.
    Panicked,
}

impl TaskOutcome {
    /// Short label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
            Self::Fatal(_) => "fatal",
            Self::Skipped => "skipped",
            Self::Panicked => "panicked",
        }
    }
}

/// One lifecycle operation for one container, moved into its worker by value.
#[derive(Debug, Clone)]
pub struct TaskUnit {
    /// Where the unit sits in the run.
    pub tag: TaskTag,
    /// Template used by the CREATE phase.
    pub template: Arc<str>,
}

impl TaskUnit {
    /// Acquires a handle, performs the phase's operation, and releases the
    /// handle again.
    ///
    /// Operation errors are reported to `sink` and returned as
    /// [`TaskOutcome::Failed`]. An acquisition error cancels `cancel`, so
    /// that the driver launches nothing further, and is returned as
    /// [`TaskOutcome::Fatal`].
    pub fn execute(
        self,
        runtime: &dyn ContainerRuntime,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> TaskOutcome {
        let task = self.tag;
        if cancel.is_cancelled() {
            return TaskOutcome::Skipped;
        }
        sink.record(&HarnessEvent::TaskStarted { task });

        let mut handle = match backend::lease(runtime, task.id) {
            Ok(handle) => handle,
            Err(error) => {
                cancel.cancel();
                sink.record(&HarnessEvent::AcquisitionFailed {
                    task,
                    error: error.clone(),
                });
                return TaskOutcome::Fatal(error);
            }
        };

        let result = match task.phase {
            Phase::Create => handle.create(&self.template),
            Phase::Start => {
                handle.set_daemonize();
                handle.start(true)
            }
            Phase::Stop => handle.stop(),
            Phase::Destroy => handle.destroy(),
        };
        drop(handle);

        match result {
            Ok(()) => TaskOutcome::Succeeded,
            Err(error) => {
                sink.record(&HarnessEvent::OperationFailed {
                    task,
                    error: error.clone(),
                });
                TaskOutcome::Failed(error)
            }
        }
    }
}

/// Completion signal owned by a running task unit.
///
/// When dropped it reports the outcome (or [`TaskOutcome::Panicked`] if none
/// was set) and then arrives at the phase barrier, so the barrier is
/// signalled on every exit path.
///
/// Release builds set `panic = "abort"`, so there a panicking unit takes the
/// process down and [`TaskOutcome::Panicked`] is only seen in unwinding builds.
pub struct Completion {
    tag: TaskTag,
    outcome: Option<TaskOutcome>,
    sink: Arc<dyn EventSink>,
    outcomes: UnboundedSender<(TaskTag, TaskOutcome)>,
    barrier: Arc<PhaseBarrier>,
}

impl Completion {
    /// Creates the completion signal for the unit tagged `tag`.
    #[must_use]
    pub fn new(
        tag: TaskTag,
        sink: Arc<dyn EventSink>,
        outcomes: UnboundedSender<(TaskTag, TaskOutcome)>,
        barrier: Arc<PhaseBarrier>,
    ) -> Self {
        Self {
            tag,
            outcome: None,
            sink,
            outcomes,
            barrier,
        }
    }

    /// Sets the outcome reported on drop.
    pub fn finish(mut self, outcome: TaskOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or(TaskOutcome::Panicked);
        self.sink.record(&HarnessEvent::TaskFinished {
            task: self.tag,
            outcome: outcome.clone(),
        });
        // The driver drains outcomes only after the barrier, so send first.
        let _ = self.outcomes.send((self.tag, outcome));
        self.barrier.arrive();
    }
}

/// Worker body: executes `unit` and signals `completion` however it ends.
pub fn run_unit(
    unit: TaskUnit,
    runtime: &dyn ContainerRuntime,
    cancel: &CancellationToken,
    completion: Completion,
) {
    let outcome = unit.execute(runtime, completion.sink.as_ref(), cancel);
    completion.finish(outcome);
}
