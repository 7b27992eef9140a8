//! Errors that end a harness run unsuccessfully.

use lifestress_runtime::error::RuntimeError;
use thiserror::Error;

use crate::task::TaskTag;

/// Why a run did not succeed.
#[derive(Debug, Clone, Error)]
pub enum HarnessError {
    /// A handle could not be acquired; no further phases were run.
    #[error("run aborted at {task}: {source}")]
    Aborted {
        /// Task whose acquisition failed.
        task: TaskTag,
        /// The acquisition error.
        source: RuntimeError,
    },

    /// The run was cancelled from outside before it finished.
    #[error("run interrupted after {completed_phases} phase(s)")]
    Interrupted {
        /// Number of phases that ran to their barrier.
        completed_phases: usize,
    },

    /// Strict mode is on and lifecycle operations failed.
    #[error("{failures} lifecycle operation(s) failed")]
    StrictFailures {
        /// Number of failed task units.
        failures: usize,
    },
}
