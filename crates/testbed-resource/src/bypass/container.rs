//! Bypass client backed by the runtime's copy and exec primitives.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use testbed_common::constants::WORLD_RWX;
use testbed_common::error::{Result, TestbedError, TransferFailure};
use testbed_common::types::join_target;
use testbed_runtime::runtime::RuntimeInstance;

use super::{BypassClient, DeploymentLease, validate_target};

/// Moves data in and out of a running instance without its protocol.
#[derive(Debug, Clone)]
pub struct ContainerBypassClient {
    instance: RuntimeInstance,
    base_path: String,
    lease: DeploymentLease,
    staging_dir: Option<PathBuf>,
}

impl ContainerBypassClient {
    /// Creates a client for `instance`, rooted at `base_path` inside it.
    ///
    /// Operations fail with `NotDeployed` once `lease` is revoked.
    #[must_use]
    pub fn new(
        instance: RuntimeInstance,
        base_path: impl Into<String>,
        lease: DeploymentLease,
    ) -> Self {
        Self {
            instance,
            base_path: base_path.into(),
            lease,
            staging_dir: None,
        }
    }

    /// Stages retrieved files in `dir` instead of the system temp directory.
    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    fn resolve(&self, name: &str) -> Result<String> {
        self.lease.check()?;
        validate_target(name)?;
        Ok(join_target(&self.base_path, name))
    }

    fn staging_file(&self) -> std::io::Result<tempfile::NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        let _ = builder.prefix("testbed-retrieve-");
        match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }
}

impl BypassClient for ContainerBypassClient {
    fn store_file(&self, name: &str, content: &[u8]) -> Result<()> {
        let path = self.resolve(name)?;
        // The server process runs as an unprivileged user and reads the file directly.
        self.instance
            .copy_in(content, WORLD_RWX, &path)
            .map_err(|e| TestbedError::transfer(&path, TransferFailure::CopyIn(Box::new(e))))?;
        tracing::debug!(id = %self.instance.id(), path, bytes = content.len(), "stored file");
        Ok(())
    }

    fn retrieve_file(&self, name: &str, sink: &mut dyn Write) -> Result<u64> {
        let path = self.resolve(name)?;

        // Copy-out only writes to host paths. The staged file is removed when
        // `staged` drops, on every return below.
        let staged = self
            .staging_file()
            .map_err(|e| TestbedError::transfer(&path, TransferFailure::Staging(e)))?;
        self.instance
            .copy_out(&path, staged.path())
            .map_err(|e| TestbedError::transfer(&path, TransferFailure::CopyOut(Box::new(e))))?;

        let mut reader = File::open(staged.path())
            .map_err(|e| TestbedError::transfer(&path, TransferFailure::Staging(e)))?;
        let copied = std::io::copy(&mut reader, sink)
            .and_then(|n| sink.flush().map(|()| n))
            .map_err(|e| TestbedError::transfer(&path, TransferFailure::Staging(e)))?;
        tracing::debug!(id = %self.instance.id(), path, bytes = copied, "retrieved file");
        Ok(copied)
    }

    fn make_directory(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        let command = vec!["mkdir".into(), "-m".into(), "a=rwx".into(), path.clone()];

        let output = self.instance.exec(&command).map_err(|e| {
            TestbedError::transfer(
                &path,
                TransferFailure::CommandFailed {
                    exit_code: None,
                    message: e.to_string(),
                },
            )
        })?;

        if output.was_interrupted() {
            return Err(TestbedError::transfer(
                &path,
                TransferFailure::Interrupted {
                    signal: output.signal,
                },
            ));
        }
        if !output.success() {
            return Err(TestbedError::transfer(
                &path,
                TransferFailure::CommandFailed {
                    exit_code: output.exit_code,
                    message: output.diagnostic().to_string(),
                },
            ));
        }
        tracing::debug!(id = %self.instance.id(), path, "created directory");
        Ok(())
    }
}
