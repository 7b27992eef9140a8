//! Runtime collaborator abstraction.
//!
//! A [`ContainerRuntime`] hands out [`ContainerHandle`]s by identifier and
//! takes them back on release. Handles are used for exactly one lifecycle
//! operation; [`lease`] wraps acquisition in a guard that releases the
//! handle on every exit path.

pub mod lxc;
pub mod simulated;

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use lifestress_common::config::{BackendKind, StressConfig};
use lifestress_common::types::ContainerId;

use crate::error::Result;

/// A live, releasable reference to one container.
pub trait ContainerHandle: Send {
    /// Identifier the handle was acquired for.
    fn id(&self) -> ContainerId;

    /// Creates the container from `template`.
    ///
    /// # Errors
    ///
    /// Returns an operation error if the runtime rejects the creation.
    fn create(&mut self, template: &str) -> Result<()>;

    /// Marks the container to run its init process in the background.
    fn set_daemonize(&mut self);

    /// Starts the container. `background` requests a non-blocking start.
    ///
    /// # Errors
    ///
    /// Returns an operation error if the container cannot be started.
    fn start(&mut self, background: bool) -> Result<()>;

    /// Stops the container.
    ///
    /// # Errors
    ///
    /// Returns an operation error if the container cannot be stopped.
    fn stop(&mut self) -> Result<()>;

    /// Destroys the container.
    ///
    /// # Errors
    ///
    /// Returns an operation error if the container cannot be destroyed.
    fn destroy(&mut self) -> Result<()>;
}

/// Platform-agnostic container runtime.
///
/// Implementors must tolerate concurrent calls for distinct identifiers.
pub trait ContainerRuntime: Send + Sync {
    /// Looks up or constructs a handle for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Acquire`](crate::error::RuntimeError::Acquire)
    /// if no handle can be obtained.
    fn acquire(&self, id: ContainerId) -> Result<Box<dyn ContainerHandle>>;

    /// Gives a handle back to the runtime.
    fn release(&self, handle: Box<dyn ContainerHandle>);

    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Returns whether this runtime is operational on the current host.
    fn is_available(&self) -> bool;
}

/// Scoped ownership of an acquired handle.
///
/// Dereferences to the handle and releases it to its runtime when dropped.
pub struct HandleLease<'a> {
    runtime: &'a dyn ContainerRuntime,
    handle: Option<Box<dyn ContainerHandle>>,
}

impl Deref for HandleLease<'_> {
    type Target = dyn ContainerHandle;

    fn deref(&self) -> &Self::Target {
        self.handle
            .as_deref()
            .unwrap_or_else(|| unreachable!("handle is only taken on drop"))
    }
}

impl DerefMut for HandleLease<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.handle
            .as_deref_mut()
            .unwrap_or_else(|| unreachable!("handle is only taken on drop"))
    }
}

impl Drop for HandleLease<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::trace!(id = %handle.id(), backend = self.runtime.name(), "releasing handle");
            self.runtime.release(handle);
        }
    }
}

/// Acquires a handle for `id` and wraps it in a releasing guard.
///
/// # Errors
///
/// Returns the runtime's acquisition error unchanged. Nothing is released
/// in that case because nothing was acquired.
pub fn lease(runtime: &dyn ContainerRuntime, id: ContainerId) -> Result<HandleLease<'_>> {
    let handle = runtime.acquire(id)?;
    Ok(HandleLease {
        runtime,
        handle: Some(handle),
    })
}

/// Builds the runtime selected by the configuration.
#[must_use]
pub fn runtime_for(config: &StressConfig) -> Arc<dyn ContainerRuntime> {
    match config.backend {
        BackendKind::Lxc => Arc::new(lxc::LxcRuntime::new(
            config.name_prefix.clone(),
            config.lxcpath.clone(),
        )),
        BackendKind::Simulated => Arc::new(
            simulated::SimulatedRuntime::new()
                .with_delay(Duration::from_millis(config.operation_delay_ms)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::simulated::SimulatedRuntime;
    use super::*;

    #[test]
    fn lease_releases_on_drop() {
        let runtime = SimulatedRuntime::new();
        {
            let mut handle = lease(&runtime, ContainerId::new(0)).unwrap();
            handle.create("busybox").unwrap();
            assert_eq!(runtime.stats().released, 0);
        }
        let stats = runtime.stats();
        assert_eq!(stats.acquired, 1);
        assert_eq!(stats.released, 1);
    }

    #[test]
    fn lease_releases_after_failed_operation() {
        let runtime = SimulatedRuntime::new();
        {
            let mut handle = lease(&runtime, ContainerId::new(3)).unwrap();
            assert!(handle.stop().is_err());
        }
        assert_eq!(runtime.stats().released, 1);
    }

    #[test]
    fn failed_acquisition_releases_nothing() {
        let runtime = SimulatedRuntime::new().fail_acquire_at(1);
        assert!(lease(&runtime, ContainerId::new(0)).is_err());
        let stats = runtime.stats();
        assert_eq!(stats.acquired, 0);
        assert_eq!(stats.released, 0);
    }

    #[test]
    fn runtime_for_selects_backend() {
        let simulated = StressConfig {
            backend: BackendKind::Simulated,
            ..StressConfig::default()
        };
        assert_eq!(runtime_for(&simulated).name(), "simulated");
        assert_eq!(runtime_for(&StressConfig::default()).name(), "lxc");
    }
}
