//! Configuration model for the testbed.
//!
//! A configuration is resolved once per test run: defaults, then an optional
//! JSON file named by `TESTBED_CONFIG`, then `TESTBED_*` environment
//! overrides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, TestbedError};
use crate::types::{Credentials, WaitStrategy};

/// Root configuration for a test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestbedConfig {
    /// Container CLI to drive. Auto-detected on `PATH` when unset.
    pub runtime_binary: Option<PathBuf>,
    /// Network whose address is resolved for deployed instances.
    pub network: String,
    /// Seconds `deploy()` waits for the service to accept connections.
    pub startup_timeout_secs: u64,
    /// Milliseconds between readiness checks.
    pub poll_interval_ms: u64,
    /// Capability name to selected implementation name.
    pub implementations: BTreeMap<String, String>,
    /// FTP resource settings.
    pub ftp: FtpConfig,
}

impl Default for TestbedConfig {
    fn default() -> Self {
        Self {
            runtime_binary: None,
            network: constants::DEFAULT_NETWORK.into(),
            startup_timeout_secs: constants::DEFAULT_STARTUP_TIMEOUT_SECS,
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
            implementations: BTreeMap::new(),
            ftp: FtpConfig::default(),
        }
    }
}

impl TestbedConfig {
    /// Loads the configuration for this test run.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed,
    /// or an override has an invalid value.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(constants::ENV_CONFIG_FILE) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        tracing::debug!(?config, "testbed configuration loaded");
        Ok(config)
    }

    /// Reads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TestbedError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Parses a JSON configuration document. Missing fields keep defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON for this model.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Applies `TESTBED_*` overrides looked up through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric override does not parse.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(binary) = lookup(constants::ENV_RUNTIME) {
            self.runtime_binary = Some(PathBuf::from(binary));
        }
        if let Some(network) = lookup(constants::ENV_NETWORK) {
            self.network = network;
        }
        if let Some(name) = lookup(constants::ENV_FTP_IMPL) {
            let _ = self
                .implementations
                .insert(constants::FTP_CAPABILITY.into(), name);
        }
        if let Some(image) = lookup(constants::ENV_FTP_IMAGE) {
            self.ftp.image = image;
        }
        if let Some(raw) = lookup(constants::ENV_STARTUP_TIMEOUT) {
            self.startup_timeout_secs = raw.trim().parse().map_err(|_| TestbedError::Config {
                message: format!(
                    "{} must be a number of seconds, got {raw:?}",
                    constants::ENV_STARTUP_TIMEOUT
                ),
            })?;
        }
        Ok(())
    }

    /// Returns the implementation selected for `capability`, if configured.
    #[must_use]
    pub fn implementation(&self, capability: &str) -> Option<&str> {
        self.implementations.get(capability).map(String::as_str)
    }

    /// Readiness strategy derived from the configured timeouts.
    #[must_use]
    pub const fn wait_strategy(&self) -> WaitStrategy {
        WaitStrategy::ListeningPort {
            timeout: Duration::from_secs(self.startup_timeout_secs),
            interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// Settings for FTP resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FtpConfig {
    /// Image started by the local FTP resource.
    pub image: String,
    /// Control port of the local FTP server.
    pub port: u16,
    /// Login user.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Directory served to the user.
    pub base_path: String,
    /// Extra environment passed to the local FTP image.
    pub env: BTreeMap<String, String>,
    /// Externally managed server, used by the remote implementation.
    pub remote: Option<RemoteFtpConfig>,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            image: constants::DEFAULT_FTP_IMAGE.into(),
            port: constants::DEFAULT_FTP_PORT,
            username: constants::DEFAULT_FTP_USERNAME.into(),
            password: constants::DEFAULT_FTP_PASSWORD.into(),
            base_path: constants::DEFAULT_FTP_BASE_PATH.into(),
            env: BTreeMap::new(),
            remote: None,
        }
    }
}

impl FtpConfig {
    /// Login credentials.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }
}

/// An FTP server that is managed outside the test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFtpConfig {
    /// Host name or IP address of the server.
    pub host: String,
    /// Control port of the server.
    pub port: u16,
    /// Host-visible mount of the directory the server serves.
    pub storage_root: PathBuf,
}
