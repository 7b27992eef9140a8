//! Domain primitive types used across the lifestress workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a container within one harness run.
///
/// Identifiers are the integers `0..count` and stay stable across the four
/// phases of an iteration: the same identifier is created, started, stopped,
/// and destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContainerId(usize);

impl ContainerId {
    /// Creates a container ID from its numeric index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the runtime-facing container name, `prefix` followed by the index.
    #[must_use]
    pub fn container_name(self, prefix: &str) -> String {
        format!("{prefix}{}", self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One stage of the container lifecycle driven by the harness.
///
/// Phases always execute in the order of [`Phase::ALL`] within an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Create the container from a template.
    Create,
    /// Start the container daemonized.
    Start,
    /// Stop the running container.
    Stop,
    /// Destroy the container.
    Destroy,
}

impl Phase {
    /// Every phase, in execution order.
    pub const ALL: [Self; 4] = [Self::Create, Self::Start, Self::Stop, Self::Destroy];

    /// Returns the upper-case phase tag used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Start => "START",
            Self::Stop => "STOP",
            Self::Destroy => "DESTROY",
        }
    }

    /// Returns the lower-case name of the runtime operation this phase invokes.
    #[must_use]
    pub const fn operation(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Destroy => "destroy",
        }
    }

    /// Position of the phase within [`Phase::ALL`].
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a container as tracked by a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerState {
    /// Known by name only; nothing exists on the runtime side.
    Defined,
    /// Container has been created but not yet started.
    Created,
    /// Container is actively running.
    Running,
    /// Container has been stopped.
    Stopped,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined => write!(f, "defined"),
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_ordered_create_start_stop_destroy() {
        let tags: Vec<_> = Phase::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(tags, ["CREATE", "START", "STOP", "DESTROY"]);
        assert!(Phase::ALL.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn phase_ordinal_matches_position() {
        for (i, phase) in Phase::ALL.iter().enumerate() {
            assert_eq!(phase.ordinal(), i);
        }
    }

    #[test]
    fn container_name_applies_prefix() {
        let id = ContainerId::new(7);
        assert_eq!(id.container_name(""), "7");
        assert_eq!(id.container_name("stress-"), "stress-7");
    }

    #[test]
    fn phase_serializes_as_tag() {
        let json = serde_json::to_string(&Phase::Destroy).unwrap();
        assert_eq!(json, "\"DESTROY\"");
    }
}
