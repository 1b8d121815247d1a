//! Out-of-band data path into a resource's storage.
//!
//! The bypass client never touches the resource's wire protocol, so fixture
//! setup and result checks stay independent of the protocol implementation
//! under test.

pub mod container;
pub mod mounted;

use std::io::Write;
use std::path::{Component, Path};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use testbed_common::error::{Result, TestbedError};

pub use container::ContainerBypassClient;
pub use mounted::MountedBypassClient;

/// Store, retrieve, and mkdir on a resource's storage without its protocol.
///
/// Targets are paths relative to the resource root and name the same
/// location the protocol client sees.
pub trait BypassClient: Send {
    /// Writes `content` to `name`, readable and writable by every user.
    ///
    /// # Errors
    ///
    /// Returns `TransferError` if the copy fails.
    fn store_file(&self, name: &str, content: &[u8]) -> Result<()>;

    /// Copies `name` into `sink`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `TransferError` if the file is missing or the copy fails.
    fn retrieve_file(&self, name: &str, sink: &mut dyn Write) -> Result<u64>;

    /// Creates directory `name`, writable by every user.
    ///
    /// # Errors
    ///
    /// Returns `TransferError` if the directory cannot be created.
    fn make_directory(&self, name: &str) -> Result<()>;

    /// Retrieves `name` into memory.
    ///
    /// # Errors
    ///
    /// See [`BypassClient::retrieve_file`].
    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        let _ = self.retrieve_file(name, &mut content)?;
        Ok(content)
    }
}

/// Binds bypass clients to one deployment of their resource.
///
/// Clones share the flag. The resource revokes the lease when it undeploys
/// and issues a fresh one on the next deploy, so a client handed out earlier
/// stays dead.
#[derive(Debug, Clone)]
pub struct DeploymentLease {
    resource: &'static str,
    live: Arc<AtomicBool>,
}

impl DeploymentLease {
    /// Creates a live lease on behalf of `resource`.
    #[must_use]
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Ends the lease for every clone.
    pub fn revoke(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Returns `true` until the lease is revoked.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Fails once the resource has been undeployed.
    ///
    /// # Errors
    ///
    /// Returns [`TestbedError::NotDeployed`] naming the resource.
    pub fn check(&self) -> Result<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(TestbedError::NotDeployed {
                resource: self.resource,
            })
        }
    }
}

/// Rejects targets that would escape the resource root.
///
/// # Errors
///
/// Returns [`TestbedError::Config`] for empty targets or targets containing
/// `..` components.
pub fn validate_target(name: &str) -> Result<()> {
    let escapes = Path::new(name)
        .components()
        .any(|c| matches!(c, Component::ParentDir));
    if name.trim_matches('/').is_empty() || escapes {
        return Err(TestbedError::Config {
            message: format!("transfer target {name:?} must name a path inside the resource"),
        });
    }
    Ok(())
}
