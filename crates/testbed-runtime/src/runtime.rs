//! The runtime collaborator interface and the instance handle built on it.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use testbed_common::error::Result;
use testbed_common::types::{InstanceId, ResourceDescriptor};

use crate::exec::ExecOutput;

/// Primitives of a container or VM runtime.
///
/// Implementors own the platform details; resources only see these calls.
/// Every call blocks until the runtime has completed the operation.
pub trait ContainerRuntime: Send + Sync {
    /// Short name used in logs, e.g. `docker`.
    fn name(&self) -> &str;

    /// Starts an isolated environment from `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment cannot be created or started.
    /// No environment is left behind on failure.
    fn start(&self, descriptor: &ResourceDescriptor) -> Result<InstanceId>;

    /// Stops and removes an environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime fails to stop the environment.
    fn stop(&self, id: &InstanceId) -> Result<()>;

    /// Executes `command` inside the environment and waits for it.
    ///
    /// A command that exits non-zero is reported through [`ExecOutput`], not
    /// as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be launched.
    fn exec(&self, id: &InstanceId, command: &[String]) -> Result<ExecOutput>;

    /// Writes `content` to `dest` inside the environment with permission
    /// bits `mode`. The parent directory of `dest` must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    fn copy_in(&self, id: &InstanceId, content: &[u8], mode: u32, dest: &str) -> Result<()>;

    /// Copies `src` from inside the environment to the host path `local_dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing or the copy fails.
    fn copy_out(&self, id: &InstanceId, src: &str, local_dest: &Path) -> Result<()>;

    /// Returns the IP address of the environment on `network`.
    ///
    /// # Errors
    ///
    /// Returns [`AddressResolution`](testbed_common::error::TestbedError::AddressResolution)
    /// if the environment is not attached to `network`.
    fn network_address(&self, id: &InstanceId, network: &str) -> Result<String>;

    /// Returns whether this runtime is usable on the current host.
    fn is_available(&self) -> bool;
}

/// Handle to one running environment.
///
/// Cheap to clone: the bypass client holds its own clone, so it does not
/// borrow from the resource that started the environment.
#[derive(Clone)]
pub struct RuntimeInstance {
    runtime: Arc<dyn ContainerRuntime>,
    id: InstanceId,
}

impl RuntimeInstance {
    /// Starts a new environment on `runtime`.
    ///
    /// # Errors
    ///
    /// Returns the runtime's start error.
    pub fn start(
        runtime: Arc<dyn ContainerRuntime>,
        descriptor: &ResourceDescriptor,
    ) -> Result<Self> {
        tracing::info!(
            runtime = runtime.name(),
            image = descriptor.image(),
            "starting instance"
        );
        let id = runtime.start(descriptor)?;
        tracing::info!(id = %id, "instance started");
        Ok(Self { runtime, id })
    }

    /// Stops the environment, consuming the handle.
    ///
    /// # Errors
    ///
    /// Returns the runtime's stop error.
    pub fn stop(self) -> Result<()> {
        tracing::info!(id = %self.id, "stopping instance");
        self.runtime.stop(&self.id)?;
        tracing::info!(id = %self.id, "instance stopped");
        Ok(())
    }

    /// Identifier assigned by the runtime.
    #[must_use]
    pub const fn id(&self) -> &InstanceId {
        &self.id
    }

    /// See [`ContainerRuntime::exec`].
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be launched.
    pub fn exec(&self, command: &[String]) -> Result<ExecOutput> {
        tracing::debug!(id = %self.id, cmd = ?command, "exec");
        self.runtime.exec(&self.id, command)
    }

    /// See [`ContainerRuntime::copy_in`].
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    pub fn copy_in(&self, content: &[u8], mode: u32, dest: &str) -> Result<()> {
        tracing::debug!(
            id = %self.id,
            dest,
            bytes = content.len(),
            mode = %format_args!("{mode:o}"),
            "copy in"
        );
        self.runtime.copy_in(&self.id, content, mode, dest)
    }

    /// See [`ContainerRuntime::copy_out`].
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    pub fn copy_out(&self, src: &str, local_dest: &Path) -> Result<()> {
        tracing::debug!(id = %self.id, src, local = %local_dest.display(), "copy out");
        self.runtime.copy_out(&self.id, src, local_dest)
    }

    /// See [`ContainerRuntime::network_address`].
    ///
    /// # Errors
    ///
    /// Returns an error if no address is attached on `network`.
    pub fn network_address(&self, network: &str) -> Result<String> {
        self.runtime.network_address(&self.id, network)
    }
}

impl fmt::Debug for RuntimeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeInstance")
            .field("runtime", &self.runtime.name())
            .field("id", &self.id)
            .finish()
    }
}
