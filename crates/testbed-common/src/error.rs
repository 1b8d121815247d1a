//! Unified error types for the testbed workspace.
//!
//! Every fallible operation in the runtime and resource crates returns
//! [`TestbedError`]. Lifecycle, transfer, and addressing failures each have a
//! dedicated variant so that harness code can match on the failure category.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum TestbedError {
    /// A resource accessor or client was used before a successful deploy.
    #[error("resource {resource} is not deployed")]
    NotDeployed {
        /// Name of the resource implementation.
        resource: &'static str,
    },

    /// `deploy()` was called on a resource that is already deployed.
    #[error("resource {resource} is already deployed as {instance}")]
    AlreadyDeployed {
        /// Name of the resource implementation.
        resource: &'static str,
        /// Identifier of the live instance.
        instance: String,
    },

    /// The backing environment failed to start or never became ready.
    #[error("failed to start {image}: {source}")]
    StartFailure {
        /// Image or template the environment was started from.
        image: String,
        /// Underlying cause.
        source: Box<TestbedError>,
    },

    /// A bypass data-path operation failed.
    #[error("transfer of {target} failed: {reason}")]
    Transfer {
        /// Path inside the resource that was being transferred.
        target: String,
        /// Why the transfer failed.
        reason: TransferFailure,
    },

    /// A deployed instance has no resolvable network address.
    #[error("cannot resolve address of {instance} on network {network}: {message}")]
    AddressResolution {
        /// Identifier of the instance.
        instance: String,
        /// Network the address was looked up on.
        network: String,
        /// Description of what was missing.
        message: String,
    },

    /// The container runtime rejected or failed a command.
    #[error("runtime {operation} failed: {message}")]
    Runtime {
        /// Runtime primitive that failed.
        operation: &'static str,
        /// Diagnostic output from the runtime.
        message: String,
    },

    /// The protocol client library reported an error.
    #[error("protocol {operation} failed: {message}")]
    Protocol {
        /// Protocol operation that failed.
        operation: &'static str,
        /// Error reported by the client library.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required item was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing item.
        kind: &'static str,
        /// Identifier of the missing item.
        id: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl TestbedError {
    /// Builds a [`TestbedError::Transfer`] for the given target.
    #[must_use]
    pub fn transfer(target: impl Into<String>, reason: TransferFailure) -> Self {
        Self::Transfer {
            target: target.into(),
            reason,
        }
    }

    /// Returns `true` for [`TestbedError::NotDeployed`].
    #[must_use]
    pub const fn is_not_deployed(&self) -> bool {
        matches!(self, Self::NotDeployed { .. })
    }
}

/// Sub-reason attached to [`TestbedError::Transfer`].
#[derive(Debug)]
pub enum TransferFailure {
    /// The copy-in primitive failed.
    CopyIn(Box<TestbedError>),
    /// The copy-out primitive failed.
    CopyOut(Box<TestbedError>),
    /// Local staging (temporary file or sink) failed.
    Staging(std::io::Error),
    /// The in-environment command could not be run or exited non-zero.
    CommandFailed {
        /// Exit code, if the command ran to completion.
        exit_code: Option<i32>,
        /// Captured diagnostic output.
        message: String,
    },
    /// The in-environment command was interrupted before completing.
    Interrupted {
        /// Signal that terminated the command, when known.
        signal: Option<i32>,
    },
}

impl fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CopyIn(e) => write!(f, "copy-in failed: {e}"),
            Self::CopyOut(e) => write!(f, "copy-out failed: {e}"),
            Self::Staging(e) => write!(f, "local staging failed: {e}"),
            Self::CommandFailed {
                exit_code: Some(code),
                message,
            } => write!(f, "command exited with {code}: {message}"),
            Self::CommandFailed {
                exit_code: None,
                message,
            } => write!(f, "command failed: {message}"),
            Self::Interrupted { signal: Some(sig) } => {
                write!(f, "command interrupted by signal {sig}")
            }
            Self::Interrupted { signal: None } => write!(f, "command interrupted"),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TestbedError>;
