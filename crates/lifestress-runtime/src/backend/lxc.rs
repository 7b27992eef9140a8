//! LXC backend driving the `lxc-*` command-line tools.

use std::path::PathBuf;
use std::process::Command;

use lifestress_common::constants::{LXC_TOOLS, MAX_CONTAINER_NAME_LEN};
use lifestress_common::types::{ContainerId, Phase};

use super::{ContainerHandle, ContainerRuntime};
use crate::error::{Result, RuntimeError};

/// Runtime that maps each lifecycle operation onto an LXC tool invocation.
///
/// Container names are the configured prefix followed by the numeric
/// identifier. Tool availability is probed once at construction.
#[derive(Debug, Clone)]
pub struct LxcRuntime {
    name_prefix: String,
    lxcpath: Option<PathBuf>,
    missing_tool: Option<&'static str>,
}

impl LxcRuntime {
    /// Creates a runtime that names containers `{name_prefix}{id}` and
    /// optionally stores them under `lxcpath`.
    #[must_use]
    pub fn new(name_prefix: String, lxcpath: Option<PathBuf>) -> Self {
        let missing_tool = LXC_TOOLS
            .iter()
            .copied()
            .find(|tool| which::which(tool).is_err());
        if let Some(tool) = missing_tool {
            tracing::warn!(tool, "LXC tool not found in PATH");
        }
        Self {
            name_prefix,
            lxcpath,
            missing_tool,
        }
    }
}

impl ContainerRuntime for LxcRuntime {
    fn acquire(&self, id: ContainerId) -> Result<Box<dyn ContainerHandle>> {
        if let Some(tool) = self.missing_tool {
            return Err(RuntimeError::Acquire {
                id,
                reason: format!("{tool} not found in PATH"),
            });
        }
        let name = id.container_name(&self.name_prefix);
        validate_name(&name).map_err(|reason| RuntimeError::Acquire { id, reason })?;

        Ok(Box::new(LxcHandle {
            id,
            name,
            lxcpath: self.lxcpath.clone(),
            daemonize: false,
        }))
    }

    fn release(&self, handle: Box<dyn ContainerHandle>) {
        drop(handle);
    }

    fn name(&self) -> &'static str {
        "lxc"
    }

    fn is_available(&self) -> bool {
        cfg!(target_os = "linux") && self.missing_tool.is_none()
    }
}

fn validate_name(name: &str) -> std::result::Result<(), String> {
    if name.len() > MAX_CONTAINER_NAME_LEN {
        return Err(format!("name '{name}' exceeds {MAX_CONTAINER_NAME_LEN} characters"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(format!("name '{name}' contains invalid character '{bad}'"));
    }
    Ok(())
}

/// Handle onto one LXC container.
#[derive(Debug)]
struct LxcHandle {
    id: ContainerId,
    name: String,
    lxcpath: Option<PathBuf>,
    daemonize: bool,
}

impl LxcHandle {
    fn command(&self, tool: &str) -> Command {
        let mut cmd = Command::new(tool);
        let _ = cmd.arg("-n").arg(&self.name);
        if let Some(path) = &self.lxcpath {
            let _ = cmd.arg("-P").arg(path);
        }
        cmd
    }

    /// `lxc-start` in daemon mode when daemonized or asked to, else foreground.
    fn start_command(&self, background: bool) -> Command {
        let mut cmd = self.command("lxc-start");
        let _ = cmd.arg(if self.daemonize || background { "-d" } else { "-F" });
        cmd
    }

    fn run(&self, phase: Phase, mut cmd: Command) -> Result<()> {
        tracing::trace!(id = %self.id, name = %self.name, ?cmd, "invoking LXC tool");

        let output = cmd.output().map_err(|e| RuntimeError::Operation {
            id: self.id,
            op: phase.operation(),
            reason: e.to_string(),
        })?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match stderr.trim() {
            "" => format!("exited with {}", output.status),
            msg => msg.to_string(),
        };
        Err(RuntimeError::Operation {
            id: self.id,
            op: phase.operation(),
            reason,
        })
    }
}

impl ContainerHandle for LxcHandle {
    fn id(&self) -> ContainerId {
        self.id
    }

    fn create(&mut self, template: &str) -> Result<()> {
        let mut cmd = self.command("lxc-create");
        let _ = cmd.arg("-t").arg(template);
        self.run(Phase::Create, cmd)
    }

    fn set_daemonize(&mut self) {
        self.daemonize = true;
    }

    fn start(&mut self, background: bool) -> Result<()> {
        let cmd = self.start_command(background);
        self.run(Phase::Start, cmd)
    }

    fn stop(&mut self) -> Result<()> {
        let cmd = self.command("lxc-stop");
        self.run(Phase::Stop, cmd)
    }

    fn destroy(&mut self) -> Result<()> {
        let cmd = self.command("lxc-destroy");
        self.run(Phase::Destroy, cmd)
    }
}
