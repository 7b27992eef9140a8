//! Errors reported by runtime collaborators.

use lifestress_common::types::ContainerId;
use thiserror::Error;

/// Failure reported by a [`ContainerRuntime`](crate::backend::ContainerRuntime)
/// or one of its handles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// No handle could be obtained for the identifier.
    #[error("cannot acquire container {id}: {reason}")]
    Acquire {
        /// Identifier that was looked up.
        id: ContainerId,
        /// Why acquisition failed.
        reason: String,
    },

    /// A lifecycle operation on an acquired handle failed.
    #[error("{op} of container {id} failed: {reason}")]
    Operation {
        /// Container the operation targeted.
        id: ContainerId,
        /// Operation name (`create`, `start`, `stop`, `destroy`).
        op: &'static str,
        /// Why the operation failed.
        reason: String,
    },
}

impl RuntimeError {
    /// Returns whether this error is fatal for a harness run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Acquire { .. })
    }
}

/// Convenience alias for runtime results.
pub type Result<T> = std::result::Result<T, RuntimeError>;
