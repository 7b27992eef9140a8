//! Driver: iterations, phases, fan-out, and the barrier join.

use std::sync::Arc;
use std::time::Instant;

use lifestress_common::config::StressConfig;
use lifestress_common::types::{ContainerId, Phase};
use lifestress_runtime::backend::ContainerRuntime;
use lifestress_runtime::error::RuntimeError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::barrier::PhaseBarrier;
use crate::error::HarnessError;
use crate::event::{EventSink, HarnessEvent};
use crate::report::{PhaseReport, RunReport, Termination};
use crate::task::{self, Completion, TaskOutcome, TaskTag, TaskUnit};

/// Runs the staged lifecycle workload against a runtime.
///
/// Iterations run strictly one after another. Within an iteration the
/// phases run in [`Phase::ALL`] order, each fanning out one task unit per
/// container identifier on the blocking pool and joining all of them on a
/// [`PhaseBarrier`] before the next phase starts.
pub struct Driver {
    config: StressConfig,
    template: Arc<str>,
    runtime: Arc<dyn ContainerRuntime>,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
}

impl Driver {
    /// Creates a driver for one run.
    #[must_use]
    pub fn new(
        config: StressConfig,
        runtime: Arc<dyn ContainerRuntime>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let template = Arc::from(config.template.as_str());
        Self {
            config,
            template,
            runtime,
            sink,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the driver's cancellation token with one owned by the caller.
    #[must_use]
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the run when cancelled.
    ///
    /// Cancelling it has the same effect as a failed acquisition: units not
    /// yet started are skipped, the current phase is drained, and no further
    /// phase runs.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Configuration the driver was built with.
    #[must_use]
    pub const fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Runs the workload and returns the report, whatever the outcome.
    pub async fn execute(&self) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::begin(self.runtime.name());
        report.expected_tasks = self.config.expected_tasks();
        self.sink.record(&HarnessEvent::RunStarted {
            backend: self.runtime.name(),
            count: self.config.count,
            iteration: self.config.iteration,
            expected_tasks: report.expected_tasks,
        });

        'run: for iteration in 0..self.config.iteration {
            self.sink.record(&HarnessEvent::IterationStarted { iteration });
            for phase in Phase::ALL {
                if self.cancel.is_cancelled() {
                    report.termination = Termination::Interrupted;
                    self.sink.record(&HarnessEvent::RunCancelled { iteration, phase });
                    break 'run;
                }

                let (tally, fatal) = self.run_phase(iteration, phase).await;
                report.phases.push(tally);

                if let Some((task, error)) = fatal {
                    report.termination = Termination::Aborted { task, error };
                    self.sink.record(&HarnessEvent::RunCancelled { iteration, phase });
                    break 'run;
                }
                if self.cancel.is_cancelled() {
                    report.termination = Termination::Interrupted;
                    self.sink.record(&HarnessEvent::RunCancelled { iteration, phase });
                    break 'run;
                }
            }
        }

        report.elapsed = started.elapsed();
        self.sink.record(&HarnessEvent::RunFinished {
            tasks: report.total_tasks(),
            failures: report.total_failures(),
            elapsed: report.elapsed,
        });
        report
    }

    /// Runs the workload and applies the configured failure policy.
    ///
    /// # Errors
    ///
    /// Returns an error if a handle could not be acquired, if the run was
    /// cancelled, or if strict mode is on and any operation failed.
    pub async fn run(&self) -> Result<RunReport, HarnessError> {
        let report = self.execute().await;
        report.verdict(self.config.strict)?;
        Ok(report)
    }

    /// Fans out one phase and blocks on its barrier.
    ///
    /// Returns the phase tally and the first acquisition failure, if any.
    async fn run_phase(
        &self,
        iteration: usize,
        phase: Phase,
    ) -> (PhaseReport, Option<(TaskTag, RuntimeError)>) {
        self.sink.record(&HarnessEvent::PhaseStarted { iteration, phase });
        let started = Instant::now();
        let count = self.config.count;
        let barrier = Arc::new(PhaseBarrier::new(count));
        let (outcomes_tx, mut outcomes_rx) = mpsc::unbounded_channel();
        let mut tally = PhaseReport::new(iteration, phase);

        for index in 0..count {
            if self.cancel.is_cancelled() {
                tally.skipped += count - index;
                barrier.arrive_many(count - index);
                break;
            }
            let unit = TaskUnit {
                tag: TaskTag {
                    iteration,
                    phase,
                    id: ContainerId::new(index),
                },
                template: Arc::clone(&self.template),
            };
            let completion = Completion::new(
                unit.tag,
                Arc::clone(&self.sink),
                outcomes_tx.clone(),
                Arc::clone(&barrier),
            );
            let runtime = Arc::clone(&self.runtime);
            let cancel = self.cancel.clone();
            let _detached = tokio::task::spawn_blocking(move || {
                task::run_unit(unit, runtime.as_ref(), &cancel, completion);
            });
            tally.launched += 1;
        }
        drop(outcomes_tx);

        barrier.wait().await;
        tally.elapsed = started.elapsed();

        let mut fatal = None;
        while let Ok((task, outcome)) = outcomes_rx.try_recv() {
            tally.record(&outcome);
            if let TaskOutcome::Fatal(error) = outcome {
                let _ = fatal.get_or_insert((task, error));
            }
        }

        self.sink.record(&HarnessEvent::PhaseCompleted {
            report: tally.clone(),
        });
        (tally, fatal)
    }
}
