//! Runs the harness with the resolved configuration.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lifestress_common::config::StressConfig;
use lifestress_harness::driver::Driver;
use lifestress_harness::event::TracingSink;
use lifestress_runtime::backend;

/// Blocking threads kept available even for small runs.
const MIN_BLOCKING_THREADS: usize = 512;

/// Builds the scheduler, drives every phase, prints the summary, and turns
/// the report into the process result.
///
/// # Errors
///
/// Returns an error if the scheduler cannot be built, the interrupt handler
/// cannot be installed, or the run ends unsuccessfully.
pub fn execute(config: StressConfig) -> anyhow::Result<()> {
    let workers = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
    tracing::debug!(workers, "using {workers} worker threads");

    let scheduler = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .max_blocking_threads(config.count.max(MIN_BLOCKING_THREADS))
        .thread_name("lifestress-worker")
        .enable_all()
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build scheduler: {e}"))?;

    let runtime = backend::runtime_for(&config);
    if !runtime.is_available() {
        tracing::warn!(backend = runtime.name(), "runtime is not available on this host, acquisitions will fail");
    }

    let driver = Driver::new(config, runtime, Arc::new(TracingSink));

    let cancel = driver.cancellation_token();
    ctrlc::set_handler(move || {
        tracing::warn!("interrupt received, finishing current phase");
        cancel.cancel();
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    let report = scheduler.block_on(driver.execute());
    eprint!("{}", crate::output::render_summary(&report));

    report.verdict(driver.config().strict)?;
    Ok(())
}
