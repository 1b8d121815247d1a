//! Runtime backend selection.

pub mod docker;

use std::path::PathBuf;
use std::sync::Arc;

use testbed_common::config::TestbedConfig;
use testbed_common::constants::RUNTIME_BINARIES;
use testbed_common::error::{Result, TestbedError};

use crate::runtime::ContainerRuntime;

/// Creates the runtime configured for this test run.
///
/// Uses `config.runtime_binary` when set, otherwise the first of
/// `docker`/`podman` found on `PATH`. The selected CLI must reach its
/// daemon.
///
/// # Errors
///
/// Returns [`TestbedError::NotFound`] if no container CLI is installed or
/// its daemon does not answer.
pub fn detect_runtime(config: &TestbedConfig) -> Result<Arc<dyn ContainerRuntime>> {
    let binary = match &config.runtime_binary {
        Some(binary) => resolve_binary(binary)?,
        None => find_runtime_binary()?,
    };
    let runtime = docker::DockerCliRuntime::new(binary.clone(), config.network.clone());
    if !runtime.is_available() {
        tracing::warn!(binary = %binary.display(), "container daemon not reachable");
        return Err(TestbedError::NotFound {
            kind: "container runtime",
            id: format!("{} (daemon not reachable)", binary.display()),
        });
    }
    tracing::info!(
        binary = %binary.display(),
        network = %config.network,
        "container runtime selected"
    );
    Ok(Arc::new(runtime))
}

/// Finds the first supported container CLI on `PATH`.
///
/// # Errors
///
/// Returns [`TestbedError::NotFound`] if none is installed.
pub fn find_runtime_binary() -> Result<PathBuf> {
    RUNTIME_BINARIES
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| TestbedError::NotFound {
            kind: "container runtime",
            id: format!(
                "{} (install one to deploy local resources)",
                RUNTIME_BINARIES.join(" or ")
            ),
        })
}

fn resolve_binary(binary: &std::path::Path) -> Result<PathBuf> {
    which::which(binary).map_err(|_| TestbedError::NotFound {
        kind: "container runtime",
        id: binary.display().to_string(),
    })
}
