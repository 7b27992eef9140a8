//! # lifestress-harness
//!
//! The staged concurrent execution engine.
//!
//! A [`Driver`](driver::Driver) runs `iteration` cycles over the fixed phase
//! sequence CREATE, START, STOP, DESTROY. Each phase fans out `count`
//! [`TaskUnit`](task::TaskUnit)s, one per container identifier, and joins
//! them on a [`PhaseBarrier`](barrier::PhaseBarrier) before the next phase
//! begins.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lifestress_common::config::StressConfig;
//! use lifestress_harness::driver::Driver;
//! use lifestress_harness::event::TracingSink;
//! use lifestress_runtime::backend::simulated::SimulatedRuntime;
//!
//! # async fn demo() -> Result<(), lifestress_harness::error::HarnessError> {
//! let driver = Driver::new(
//!     StressConfig::default(),
//!     Arc::new(SimulatedRuntime::new()),
//!     Arc::new(TracingSink),
//! );
//! let report = driver.run().await?;
//! assert_eq!(report.total_tasks(), 40);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod barrier;
pub mod driver;
pub mod error;
pub mod event;
pub mod report;
pub mod task;
