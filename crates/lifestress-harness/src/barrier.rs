//! Phase barrier: the rendezvous that separates phases.
//!
//! The barrier starts with the number of task units launched for a phase.
//! Each unit arrives exactly once when it finishes; the driver's
//! [`wait`](PhaseBarrier::wait) resolves only once every unit has arrived.
//! There is no timeout.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Countdown barrier for one phase.
#[derive(Debug)]
pub struct PhaseBarrier {
    outstanding: AtomicUsize,
    drained: Notify,
}

impl PhaseBarrier {
    /// Creates a barrier expecting `count` arrivals.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            outstanding: AtomicUsize::new(count),
            drained: Notify::new(),
        }
    }

    /// Number of units that have not arrived yet.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Records the completion of one unit.
    pub fn arrive(&self) {
        self.arrive_many(1);
    }

    /// Records `n` units at once. The driver uses this for units it never
    /// launched because the run was cancelled mid fan-out.
    pub fn arrive_many(&self, n: usize) {
        if n == 0 {
            return;
        }
        match self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(n))
        {
            Ok(left) if left == n => self.drained.notify_waiters(),
            Ok(_) => {}
            Err(left) => {
                tracing::error!(left, arrivals = n, "more arrivals than outstanding units");
            }
        }
    }

    /// Waits until every unit has arrived.
    pub async fn wait(&self) {
        loop {
            let drained = self.drained.notified();
            tokio::pin!(drained);
            // Register before checking so a concurrent final arrival cannot be missed.
            let _ = drained.as_mut().enable();
            if self.outstanding() == 0 {
                return;
            }
            drained.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn empty_barrier_is_already_drained() {
        let barrier = PhaseBarrier::new(0);
        barrier.wait().await;
        assert_eq!(barrier.outstanding(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn wait_blocks_until_last_arrival() {
        let barrier = Arc::new(PhaseBarrier::new(3));
        barrier.arrive();
        barrier.arrive();

        let pending = tokio::time::timeout(Duration::from_millis(50), barrier.wait()).await;
        assert!(pending.is_err(), "barrier released with one unit outstanding");

        let b = Arc::clone(&barrier);
        let waiter = tokio::spawn(async move { b.wait().await });
        barrier.arrive();
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("barrier never released")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_arrivals_drain_exactly_once() {
        const UNITS: usize = 64;
        let barrier = Arc::new(PhaseBarrier::new(UNITS));
        for _ in 0..UNITS {
            let b = Arc::clone(&barrier);
            let _ = tokio::task::spawn_blocking(move || b.arrive());
        }
        tokio::time::timeout(Duration::from_secs(5), barrier.wait())
            .await
            .expect("barrier never released");
        assert_eq!(barrier.outstanding(), 0);
    }

    #[test]
    fn arrive_many_counts_forfeited_units() {
        let barrier = PhaseBarrier::new(5);
        barrier.arrive();
        barrier.arrive_many(4);
        assert_eq!(barrier.outstanding(), 0);
    }

    #[test]
    fn surplus_arrival_leaves_count_at_zero() {
        let barrier = PhaseBarrier::new(1);
        barrier.arrive();
        barrier.arrive();
        assert_eq!(barrier.outstanding(), 0);
    }
}
