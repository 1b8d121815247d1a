//! FTP server managed outside the test run.

use testbed_common::config::{RemoteFtpConfig, TestbedConfig};
use testbed_common::error::{Result, TestbedError};
use testbed_common::types::{Address, Credentials, ResourceState, WaitStrategy};
use testbed_runtime::wait::wait_until_ready;

use super::FtpEndpoint;
use crate::bypass::{BypassClient, DeploymentLease, MountedBypassClient};
use crate::deployable::Deployable;

const NAME: &str = "remote-ftp";

/// An already running FTP server whose served directory is mounted on the
/// test host.
///
/// Deploying only checks that the server answers and the mount exists.
/// Undeploying detaches without touching the server.
#[derive(Debug)]
pub struct RemoteFtp {
    remote: RemoteFtpConfig,
    credentials: Credentials,
    wait: WaitStrategy,
    lease: Option<DeploymentLease>,
}

impl RemoteFtp {
    /// Creates a detached resource for `remote`.
    #[must_use]
    pub const fn new(remote: RemoteFtpConfig, credentials: Credentials, wait: WaitStrategy) -> Self {
        Self {
            remote,
            credentials,
            wait,
            lease: None,
        }
    }

    /// Creates a detached resource from `config.ftp.remote`.
    ///
    /// # Errors
    ///
    /// Returns [`TestbedError::Config`] if no remote server is configured.
    pub fn from_config(config: &TestbedConfig) -> Result<Self> {
        let remote = config.ftp.remote.clone().ok_or_else(|| TestbedError::Config {
            message: "ftp.remote must be set to use the remote FTP resource".into(),
        })?;
        Ok(Self::new(
            remote,
            config.ftp.credentials(),
            config.wait_strategy(),
        ))
    }

    fn configured_address(&self) -> Address {
        Address::new(&self.remote.host, self.remote.port)
    }

    fn lease(&self) -> Result<&DeploymentLease> {
        self.lease
            .as_ref()
            .ok_or(TestbedError::NotDeployed { resource: NAME })
    }
}

impl Deployable for RemoteFtp {
    fn name(&self) -> &'static str {
        NAME
    }

    fn deploy(&mut self) -> Result<()> {
        let address = self.configured_address();
        if self.lease.is_some() {
            return Err(TestbedError::AlreadyDeployed {
                resource: NAME,
                instance: address.to_string(),
            });
        }
        if !self.remote.storage_root.is_dir() {
            return Err(TestbedError::Config {
                message: format!(
                    "storage root {} is not a directory",
                    self.remote.storage_root.display()
                ),
            });
        }
        wait_until_ready(&address, self.wait).map_err(|e| TestbedError::StartFailure {
            image: format!("ftp://{address}"),
            source: Box::new(e),
        })?;
        self.lease = Some(DeploymentLease::new(NAME));
        tracing::info!(%address, "attached to remote ftp server");
        Ok(())
    }

    fn undeploy(&mut self) -> Result<()> {
        if let Some(lease) = self.lease.take() {
            lease.revoke();
            tracing::info!(address = %self.configured_address(), "detached from remote ftp server");
        }
        Ok(())
    }

    fn state(&self) -> ResourceState {
        if self.lease.is_some() {
            ResourceState::Deployed
        } else {
            ResourceState::Undeployed
        }
    }
}

impl FtpEndpoint for RemoteFtp {
    fn address(&self) -> Result<Address> {
        let _ = self.lease()?;
        Ok(self.configured_address())
    }

    fn credentials(&self) -> Credentials {
        self.credentials.clone()
    }

    fn bypass_client(&self) -> Result<Box<dyn BypassClient>> {
        let lease = self.lease()?.clone();
        Ok(Box::new(MountedBypassClient::new(
            self.remote.storage_root.clone(),
            lease,
        )))
    }
}
