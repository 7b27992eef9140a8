//! In-memory runtime that models the container lifecycle.
//!
//! Every container moves `Defined → Created → Running → Stopped` and back to
//! `Defined` on destroy. Transitions outside that graph are rejected as
//! operation errors, the same way a real runtime refuses to start a
//! container that was never created. Failure injection and counters make
//! this the test double for the harness.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lifestress_common::types::{ContainerId, ContainerState, Phase};

use super::{ContainerHandle, ContainerRuntime};
use crate::error::{Result, RuntimeError};

/// Counters observed by a [`SimulatedRuntime`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatedStats {
    /// Successful acquisitions.
    pub acquired: usize,
    /// Releases.
    pub released: usize,
    /// Handles currently held.
    pub outstanding: usize,
    /// Highest number of handles held at the same time.
    pub peak_outstanding: usize,
    /// Acquisitions of an identifier that already had a live handle.
    pub overlapping: usize,
    /// Operations that completed successfully.
    pub succeeded: usize,
    /// Operations that returned an error.
    pub failed: usize,
}

#[derive(Debug, Default)]
struct Ledger {
    states: HashMap<ContainerId, ContainerState>,
    live: HashSet<ContainerId>,
    stats: SimulatedStats,
}

#[derive(Debug, Default)]
struct Shared {
    ledger: Mutex<Ledger>,
    acquire_calls: AtomicUsize,
    delay: Duration,
    failing: HashSet<Phase>,
    fail_acquire_at: Option<usize>,
}

impl Shared {
    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runtime collaborator backed by an in-memory state table.
#[derive(Debug, Clone, Default)]
pub struct SimulatedRuntime {
    shared: Arc<Shared>,
}

impl SimulatedRuntime {
    /// Creates a runtime with no latency and no injected failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps for `delay` inside every lifecycle operation.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        self.configure(|s| s.delay = delay)
    }

    /// Makes every operation of `phase` fail.
    #[must_use]
    pub fn fail_operation(self, phase: Phase) -> Self {
        self.configure(|s| {
            let _ = s.failing.insert(phase);
        })
    }

    /// Makes the `nth` acquisition (1-based, counting every call) fail.
    #[must_use]
    pub fn fail_acquire_at(self, nth: usize) -> Self {
        self.configure(|s| s.fail_acquire_at = Some(nth))
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> SimulatedStats {
        self.shared.ledger().stats
    }

    /// Returns the tracked state of a container.
    #[must_use]
    pub fn state(&self, id: ContainerId) -> ContainerState {
        self.shared
            .ledger()
            .states
            .get(&id)
            .copied()
            .unwrap_or(ContainerState::Defined)
    }

    fn configure(self, apply: impl FnOnce(&mut Shared)) -> Self {
        let mut shared = Arc::try_unwrap(self.shared).unwrap_or_else(|arc| Shared {
            ledger: Mutex::default(),
            acquire_calls: AtomicUsize::new(0),
            delay: arc.delay,
            failing: arc.failing.clone(),
            fail_acquire_at: arc.fail_acquire_at,
        });
        apply(&mut shared);
        Self {
            shared: Arc::new(shared),
        }
    }
}

impl ContainerRuntime for SimulatedRuntime {
    fn acquire(&self, id: ContainerId) -> Result<Box<dyn ContainerHandle>> {
        let call = self.shared.acquire_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.shared.fail_acquire_at == Some(call) {
            return Err(RuntimeError::Acquire {
                id,
                reason: format!("injected failure on acquisition #{call}"),
            });
        }

        let mut ledger = self.shared.ledger();
        if !ledger.live.insert(id) {
            ledger.stats.overlapping += 1;
            tracing::warn!(%id, "container acquired while another handle is live");
        }
        ledger.stats.acquired += 1;
        ledger.stats.outstanding += 1;
        ledger.stats.peak_outstanding = ledger.stats.peak_outstanding.max(ledger.stats.outstanding);
        drop(ledger);

        Ok(Box::new(SimulatedHandle {
            id,
            daemonize: false,
            shared: Arc::clone(&self.shared),
        }))
    }

    fn release(&self, handle: Box<dyn ContainerHandle>) {
        let mut ledger = self.shared.ledger();
        let _ = ledger.live.remove(&handle.id());
        ledger.stats.released += 1;
        ledger.stats.outstanding = ledger.stats.outstanding.saturating_sub(1);
    }

    fn name(&self) -> &'static str {
        "simulated"
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Handle onto one simulated container.
#[derive(Debug)]
struct SimulatedHandle {
    id: ContainerId,
    daemonize: bool,
    shared: Arc<Shared>,
}

impl SimulatedHandle {
    fn transition(
        &self,
        phase: Phase,
        allowed: &[ContainerState],
        to: ContainerState,
    ) -> Result<()> {
        if !self.shared.delay.is_zero() {
            std::thread::sleep(self.shared.delay);
        }

        let mut ledger = self.shared.ledger();
        let from = ledger
            .states
            .get(&self.id)
            .copied()
            .unwrap_or(ContainerState::Defined);

        let outcome = if self.shared.failing.contains(&phase) {
            Err("injected failure".to_string())
        } else if allowed.contains(&from) {
            Ok(())
        } else {
            Err(format!("container is {from}"))
        };

        match outcome {
            Ok(()) => {
                if to == ContainerState::Defined {
                    let _ = ledger.states.remove(&self.id);
                } else {
                    let _ = ledger.states.insert(self.id, to);
                }
                ledger.stats.succeeded += 1;
                Ok(())
            }
            Err(reason) => {
                ledger.stats.failed += 1;
                Err(RuntimeError::Operation {
                    id: self.id,
                    op: phase.operation(),
                    reason,
                })
            }
        }
    }
}

impl ContainerHandle for SimulatedHandle {
    fn id(&self) -> ContainerId {
        self.id
    }

    fn create(&mut self, template: &str) -> Result<()> {
        tracing::trace!(id = %self.id, template, "simulated create");
        self.transition(Phase::Create, &[ContainerState::Defined], ContainerState::Created)
    }

    fn set_daemonize(&mut self) {
        self.daemonize = true;
    }

    fn start(&mut self, background: bool) -> Result<()> {
        if !(self.daemonize || background) {
            return Err(RuntimeError::Operation {
                id: self.id,
                op: Phase::Start.operation(),
                reason: "foreground start is not supported".into(),
            });
        }
        self.transition(
            Phase::Start,
            &[ContainerState::Created, ContainerState::Stopped],
            ContainerState::Running,
        )
    }

    fn stop(&mut self) -> Result<()> {
        self.transition(Phase::Stop, &[ContainerState::Running], ContainerState::Stopped)
    }

    fn destroy(&mut self) -> Result<()> {
        self.transition(
            Phase::Destroy,
            &[ContainerState::Created, ContainerState::Stopped],
            ContainerState::Defined,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_cycle(runtime: &SimulatedRuntime, id: ContainerId) -> Vec<Result<()>> {
        let mut results = Vec::new();
        for phase in Phase::ALL {
            let mut handle = runtime.acquire(id).unwrap();
            let result = match phase {
                Phase::Create => handle.create("busybox"),
                Phase::Start => {
                    handle.set_daemonize();
                    handle.start(true)
                }
                Phase::Stop => handle.stop(),
                Phase::Destroy => handle.destroy(),
            };
            runtime.release(handle);
            results.push(result);
        }
        results
    }

    #[test]
    fn full_cycle_returns_container_to_defined() {
        let runtime = SimulatedRuntime::new();
        let id = ContainerId::new(1);
        assert!(run_cycle(&runtime, id).iter().all(Result::is_ok));
        assert_eq!(runtime.state(id), ContainerState::Defined);

        let stats = runtime.stats();
        assert_eq!(stats.acquired, 4);
        assert_eq!(stats.released, 4);
        assert_eq!(stats.outstanding, 0);
        assert_eq!(stats.succeeded, 4);
    }

    #[test]
    fn start_without_create_is_rejected() {
        let runtime = SimulatedRuntime::new();
        let mut handle = runtime.acquire(ContainerId::new(0)).unwrap();
        handle.set_daemonize();
        let err = handle.start(true).unwrap_err();
        assert!(matches!(err, RuntimeError::Operation { op: "start", .. }));
        runtime.release(handle);
    }

    #[test]
    fn destroy_of_running_container_is_rejected() {
        let runtime = SimulatedRuntime::new();
        let id = ContainerId::new(2);
        let mut handle = runtime.acquire(id).unwrap();
        handle.create("busybox").unwrap();
        handle.set_daemonize();
        handle.start(true).unwrap();
        assert!(handle.destroy().is_err());
        runtime.release(handle);
        assert_eq!(runtime.state(id), ContainerState::Running);
    }

    #[test]
    fn injected_create_failure_cascades() {
        let runtime = SimulatedRuntime::new().fail_operation(Phase::Create);
        let results = run_cycle(&runtime, ContainerId::new(0));
        assert!(results.iter().all(Result::is_err));
        assert_eq!(runtime.stats().failed, 4);
        assert_eq!(runtime.stats().released, 4);
    }

    #[test]
    fn nth_acquisition_fails() {
        let runtime = SimulatedRuntime::new().fail_acquire_at(2);
        assert!(runtime.acquire(ContainerId::new(0)).is_ok());
        let err = runtime.acquire(ContainerId::new(1)).err().unwrap();
        assert!(err.is_fatal());
        assert!(runtime.acquire(ContainerId::new(2)).is_ok());
        assert_eq!(runtime.stats().acquired, 2);
    }

    #[test]
    fn overlapping_handles_are_counted() {
        let runtime = SimulatedRuntime::new();
        let first = runtime.acquire(ContainerId::new(5)).unwrap();
        let second = runtime.acquire(ContainerId::new(5)).unwrap();
        assert_eq!(runtime.stats().overlapping, 1);
        assert_eq!(runtime.stats().peak_outstanding, 2);
        runtime.release(first);
        runtime.release(second);
        assert_eq!(runtime.stats().outstanding, 0);
    }

    #[test]
    fn foreground_start_is_rejected() {
        let runtime = SimulatedRuntime::new();
        let mut handle = runtime.acquire(ContainerId::new(0)).unwrap();
        handle.create("busybox").unwrap();
        assert!(handle.start(false).is_err());
        runtime.release(handle);
    }
}
