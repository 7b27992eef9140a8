//! Run configuration for the stress harness.
//!
//! A [`StressConfig`] is built once (defaults, then an optional JSON file,
//! then command-line overrides) and handed to the driver by value. Nothing
//! reads configuration from global state.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_COUNT, DEFAULT_ITERATION, DEFAULT_TEMPLATE, MAX_CONTAINER_NAME_LEN};
use crate::error::{LifestressError, Result};
use crate::types::Phase;

/// Which runtime collaborator the harness drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The LXC command-line tools.
    #[default]
    Lxc,
    /// The in-memory lifecycle model.
    Simulated,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lxc => write!(f, "lxc"),
            Self::Simulated => write!(f, "simulated"),
        }
    }
}

/// Complete configuration of one harness run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// Template passed to every create operation.
    pub template: String,
    /// Number of concurrent task units per phase.
    pub count: usize,
    /// Number of full lifecycle cycles.
    pub iteration: usize,
    /// Raises log verbosity. Has no effect on control flow.
    pub debug: bool,
    /// Fail the run when any lifecycle operation failed.
    pub strict: bool,
    /// Runtime collaborator to drive.
    pub backend: BackendKind,
    /// Prefix prepended to the numeric identifier to form container names.
    pub name_prefix: String,
    /// Alternate LXC path (`lxc-* -P`).
    pub lxcpath: Option<PathBuf>,
    /// Artificial latency for every simulated operation, in milliseconds.
    pub operation_delay_ms: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            count: DEFAULT_COUNT,
            iteration: DEFAULT_ITERATION,
            debug: false,
            strict: false,
            backend: BackendKind::default(),
            name_prefix: String::new(),
            lxcpath: None,
            operation_delay_ms: 0,
        }
    }
}

impl StressConfig {
    /// Loads a configuration file. Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LifestressError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Checks the values that the runtimes cannot cope with.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is blank, the task total overflows,
    /// or the longest container name would exceed what the runtime accepts.
    pub fn validate(&self) -> Result<()> {
        if self.template.trim().is_empty() {
            return Err(LifestressError::Config {
                message: "template must not be empty".into(),
            });
        }
        if self.expected_tasks().is_none() {
            return Err(LifestressError::Config {
                message: format!(
                    "{} containers over {} iterations is more tasks than can be counted",
                    self.count, self.iteration
                ),
            });
        }
        if let Some(last) = self.count.checked_sub(1) {
            let longest = self.name_prefix.len() + last.to_string().len();
            if longest > MAX_CONTAINER_NAME_LEN {
                return Err(LifestressError::Config {
                    message: format!(
                        "container names would be {longest} characters long (max {MAX_CONTAINER_NAME_LEN})"
                    ),
                });
            }
        }
        Ok(())
    }

    /// Number of task units a full run executes: one per container per
    /// phase per iteration. `None` if that does not fit in a `usize`.
    #[must_use]
    pub fn expected_tasks(&self) -> Option<usize> {
        Phase::ALL
            .len()
            .checked_mul(self.count)?
            .checked_mul(self.iteration)
    }
}
