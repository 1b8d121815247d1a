//! Bypass client for storage mounted on the test host.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use testbed_common::error::{Result, TestbedError, TransferFailure};

use super::{BypassClient, DeploymentLease, validate_target};

/// Reads and writes a resource's storage through a host-visible directory.
#[derive(Debug, Clone)]
pub struct MountedBypassClient {
    root: PathBuf,
    lease: DeploymentLease,
}

impl MountedBypassClient {
    /// Creates a client over `root`, the host mount of the served directory.
    ///
    /// Operations fail with `NotDeployed` once `lease` is revoked.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, lease: DeploymentLease) -> Self {
        Self {
            root: root.into(),
            lease,
        }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        self.lease.check()?;
        validate_target(name)?;
        Ok(self.root.join(name.trim_start_matches('/')))
    }
}

impl BypassClient for MountedBypassClient {
    fn store_file(&self, name: &str, content: &[u8]) -> Result<()> {
        let path = self.resolve(name)?;
        let target = path.display().to_string();
        std::fs::write(&path, content)
            .and_then(|()| set_world_rwx(&path))
            .map_err(|e| copy_in_failure(&path, e))?;
        tracing::debug!(path = %target, bytes = content.len(), "stored file");
        Ok(())
    }

    fn retrieve_file(&self, name: &str, sink: &mut dyn Write) -> Result<u64> {
        let path = self.resolve(name)?;
        let target = path.display().to_string();
        let mut reader = File::open(&path).map_err(|e| {
            let source = TestbedError::Io {
                path: path.clone(),
                source: e,
            };
            TestbedError::transfer(&target, TransferFailure::CopyOut(Box::new(source)))
        })?;
        let copied = std::io::copy(&mut reader, sink)
            .and_then(|n| sink.flush().map(|()| n))
            .map_err(|e| TestbedError::transfer(&target, TransferFailure::Staging(e)))?;
        Ok(copied)
    }

    fn make_directory(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        let target = path.display().to_string();
        // The process umask trims the mode passed to mkdir, so set it afterwards.
        std::fs::create_dir(&path)
            .and_then(|()| set_world_rwx(&path))
            .map_err(|e| copy_in_failure(&path, e))?;
        tracing::debug!(path = %target, "created directory");
        Ok(())
    }
}

fn copy_in_failure(path: &Path, source: std::io::Error) -> TestbedError {
    let io = TestbedError::Io {
        path: path.to_path_buf(),
        source,
    };
    TestbedError::transfer(path.display().to_string(), TransferFailure::CopyIn(Box::new(io)))
}

#[cfg(unix)]
fn set_world_rwx(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(
        path,
        std::fs::Permissions::from_mode(testbed_common::constants::WORLD_RWX),
    )
}

#[cfg(not(unix))]
fn set_world_rwx(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
