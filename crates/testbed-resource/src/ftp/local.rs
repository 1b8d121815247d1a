//! FTP server started in a container for the duration of a deployment.

use std::fmt;
use std::sync::Arc;

use testbed_common::config::TestbedConfig;
use testbed_common::error::{Result, TestbedError};
use testbed_common::types::{Address, Credentials, ResourceDescriptor, ResourceState};
use testbed_runtime::backend::detect_runtime;
use testbed_runtime::runtime::{ContainerRuntime, RuntimeInstance};
use testbed_runtime::wait::wait_until_ready;

use super::FtpEndpoint;
use crate::bypass::{BypassClient, ContainerBypassClient, DeploymentLease};
use crate::deployable::Deployable;

const NAME: &str = "local-ftp";

/// A containerized FTP server.
///
/// Each `deploy` starts a fresh instance and resolves its address anew, so
/// nothing from a previous deployment leaks into the next one.
pub struct LocalFtp {
    runtime: Arc<dyn ContainerRuntime>,
    descriptor: ResourceDescriptor,
    network: String,
    credentials: Credentials,
    base_path: String,
    running: Option<Running>,
}

struct Running {
    instance: RuntimeInstance,
    address: Address,
    lease: DeploymentLease,
}

impl LocalFtp {
    /// Creates an undeployed server that will run on `runtime`.
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: &TestbedConfig) -> Self {
        Self::with_descriptor(runtime, config, descriptor_from_config(config))
    }

    /// Creates an undeployed server on the runtime detected for `config`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no container runtime is installed.
    pub fn from_config(config: &TestbedConfig) -> Result<Self> {
        Ok(Self::new(detect_runtime(config)?, config))
    }

    /// Creates an undeployed server from an explicit descriptor.
    ///
    /// `descriptor` must configure the image with the credentials and base
    /// path taken from `config.ftp`.
    #[must_use]
    pub fn with_descriptor(
        runtime: Arc<dyn ContainerRuntime>,
        config: &TestbedConfig,
        descriptor: ResourceDescriptor,
    ) -> Self {
        Self {
            runtime,
            descriptor,
            network: config.network.clone(),
            credentials: config.ftp.credentials(),
            base_path: config.ftp.base_path.clone(),
            running: None,
        }
    }

    fn running(&self) -> Result<&Running> {
        self.running
            .as_ref()
            .ok_or(TestbedError::NotDeployed { resource: NAME })
    }

    fn resolve_address(&self, instance: &RuntimeInstance) -> Result<Address> {
        // Passive mode hands out data ports the runtime does not publish, so
        // the client must reach the instance's own network address rather
        // than a forwarded loopback port.
        let host = instance.network_address(&self.network)?;
        Ok(Address::new(host, self.descriptor.port()))
    }

    fn start(&self) -> Result<Running> {
        let image = self.descriptor.image().to_owned();
        let instance = RuntimeInstance::start(Arc::clone(&self.runtime), &self.descriptor)
            .map_err(|e| TestbedError::StartFailure {
                image: image.clone(),
                source: Box::new(e),
            })?;

        let ready = self.resolve_address(&instance).and_then(|address| {
            wait_until_ready(&address, self.descriptor.wait_strategy())
                .map(|()| address)
                .map_err(|e| TestbedError::StartFailure {
                    image: image.clone(),
                    source: Box::new(e),
                })
        });

        match ready {
            Ok(address) => Ok(Running {
                instance,
                address,
                lease: DeploymentLease::new(NAME),
            }),
            Err(e) => {
                let id = instance.id().clone();
                if let Err(stop_err) = instance.stop() {
                    tracing::warn!(id = %id, error = %stop_err, "cleanup after failed start");
                }
                Err(e)
            }
        }
    }
}

impl Deployable for LocalFtp {
    fn name(&self) -> &'static str {
        NAME
    }

    fn deploy(&mut self) -> Result<()> {
        if let Some(running) = &self.running {
            return Err(TestbedError::AlreadyDeployed {
                resource: NAME,
                instance: running.instance.id().to_string(),
            });
        }
        let running = self.start()?;
        tracing::info!(
            id = %running.instance.id(),
            address = %running.address,
            "ftp server deployed"
        );
        self.running = Some(running);
        Ok(())
    }

    fn undeploy(&mut self) -> Result<()> {
        match self.running.take() {
            Some(running) => {
                running.lease.revoke();
                running.instance.stop()
            }
            None => Ok(()),
        }
    }

    fn state(&self) -> ResourceState {
        if self.running.is_some() {
            ResourceState::Deployed
        } else {
            ResourceState::Undeployed
        }
    }
}

impl FtpEndpoint for LocalFtp {
    fn address(&self) -> Result<Address> {
        Ok(self.running()?.address.clone())
    }

    fn credentials(&self) -> Credentials {
        self.credentials.clone()
    }

    fn bypass_client(&self) -> Result<Box<dyn BypassClient>> {
        let running = self.running()?;
        Ok(Box::new(ContainerBypassClient::new(
            running.instance.clone(),
            self.base_path.clone(),
            running.lease.clone(),
        )))
    }
}

impl Drop for LocalFtp {
    fn drop(&mut self) {
        if let Err(e) = self.undeploy() {
            tracing::warn!(resource = NAME, error = %e, "teardown on drop failed");
        }
    }
}

impl fmt::Debug for LocalFtp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFtp")
            .field("runtime", &self.runtime.name())
            .field("image", &self.descriptor.image())
            .field("network", &self.network)
            .field("base_path", &self.base_path)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Builds the container descriptor for the configured FTP image.
///
/// Entries in `config.ftp.env` override the generated variables.
#[must_use]
pub fn descriptor_from_config(config: &TestbedConfig) -> ResourceDescriptor {
    let ftp = &config.ftp;
    ResourceDescriptor::new(&ftp.image, ftp.port)
        .env("FTP_USER_NAME", &ftp.username)
        .env("FTP_USER_PASS", &ftp.password)
        .env("FTP_USER_HOME", &ftp.base_path)
        .env("ADDED_FLAGS", format!("--bind 0.0.0.0,{}", ftp.port))
        .with_env(ftp.env.clone())
        .wait(config.wait_strategy())
}
