//! Domain primitive types used across the testbed workspace.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TestbedError};

/// Identifier of a running runtime instance, as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(String);

impl InstanceId {
    /// Creates an instance ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolved host and port of a deployed resource.
///
/// Never cached across redeploys: the host depends on the network identity
/// the runtime assigns at start.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Address {
    /// Creates an address from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// How `deploy()` decides that the backing service is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitStrategy {
    /// Return as soon as the runtime reports the instance started.
    Immediate,
    /// Poll until the resolved address accepts TCP connections.
    ListeningPort {
        /// Deadline for the service to start listening.
        timeout: Duration,
        /// Delay between connection attempts.
        interval: Duration,
    },
}

impl Default for WaitStrategy {
    fn default() -> Self {
        Self::ListeningPort {
            timeout: Duration::from_secs(crate::constants::DEFAULT_STARTUP_TIMEOUT_SECS),
            interval: Duration::from_millis(crate::constants::DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Logical configuration of the environment backing a resource.
///
/// Immutable once handed to a resource; consumed by `deploy()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    image: String,
    port: u16,
    env: BTreeMap<String, String>,
    wait: WaitStrategy,
}

impl ResourceDescriptor {
    /// Creates a descriptor for `image` exposing `port`, with no environment.
    #[must_use]
    pub fn new(image: impl Into<String>, port: u16) -> Self {
        Self {
            image: image.into(),
            port,
            env: BTreeMap::new(),
            wait: WaitStrategy::default(),
        }
    }

    /// Adds an environment variable, replacing an earlier value for `key`.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.env.insert(key.into(), value.into());
        self
    }

    /// Adds every entry of `env`, replacing earlier values for the same keys.
    #[must_use]
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// Sets the readiness strategy.
    #[must_use]
    pub const fn wait(mut self, wait: WaitStrategy) -> Self {
        self.wait = wait;
        self
    }

    /// Checks that the descriptor can be started.
    ///
    /// # Errors
    ///
    /// Returns [`TestbedError::Config`] if the image is empty, the port is
    /// zero, or an environment key is empty or contains `=`.
    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            return Err(TestbedError::Config {
                message: "resource image must not be empty".into(),
            });
        }
        if self.port == 0 {
            return Err(TestbedError::Config {
                message: format!("resource {} must expose a non-zero port", self.image),
            });
        }
        if let Some(key) = self.env.keys().find(|k| k.is_empty() || k.contains('=')) {
            return Err(TestbedError::Config {
                message: format!("invalid environment variable name {key:?}"),
            });
        }
        Ok(())
    }

    /// Image or template identifier.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Port the service listens on inside the environment.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Environment variables, sorted by key.
    #[must_use]
    pub const fn environment(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Readiness strategy.
    #[must_use]
    pub const fn wait_strategy(&self) -> WaitStrategy {
        self.wait
    }
}

/// Login credentials for a protocol endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials from a user name and password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Lifecycle state of a deployable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceState {
    /// No live instance; the address is undefined.
    Undeployed,
    /// Exactly one live instance; the address is resolvable.
    Deployed,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undeployed => write!(f, "undeployed"),
            Self::Deployed => write!(f, "deployed"),
        }
    }
}

/// Joins a resource base path and a transfer target into one absolute path.
///
/// The in-environment bypass path resolves every target through this, so a
/// target names the same file the protocol client sees from its login
/// directory.
#[must_use]
pub fn join_target(base_path: &str, target: &str) -> String {
    let base = base_path.trim_end_matches('/');
    let target = target.trim_start_matches('/');
    if base.is_empty() {
        format!("/{target}")
    } else {
        format!("{base}/{target}")
    }
}
