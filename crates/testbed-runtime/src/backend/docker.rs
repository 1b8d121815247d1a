//! Container backend driving the `docker` (or CLI-compatible `podman`) binary.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use testbed_common::constants::{APP_NAME, DEFAULT_NETWORK};
use testbed_common::error::{Result, TestbedError};
use testbed_common::types::{InstanceId, ResourceDescriptor};

use crate::archive;
use crate::exec::{self, ExecOutput};
use crate::runtime::ContainerRuntime;

/// Backend that shells out to a Docker-compatible CLI.
#[derive(Debug, Clone)]
pub struct DockerCliRuntime {
    binary: PathBuf,
    network: String,
}

impl DockerCliRuntime {
    /// Creates a backend for `binary`, attaching instances to `network`.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, network: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            network: network.into(),
        }
    }

    /// Runs the CLI with `args`, returning its output regardless of status.
    fn run(&self, args: &[String]) -> Result<Output> {
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| TestbedError::Io {
                path: self.binary.clone(),
                source: e,
            })
    }

    /// Runs the CLI with `args` and fails on a non-zero status.
    fn run_checked(&self, operation: &'static str, args: &[String]) -> Result<Output> {
        let output = self.run(args)?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(command_error(operation, &output))
        }
    }

    /// Runs the CLI with `args`, streaming `input` into its stdin.
    fn run_with_stdin(
        &self,
        operation: &'static str,
        args: &[String],
        input: &[u8],
    ) -> Result<()> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TestbedError::Io {
                path: self.binary.clone(),
                source: e,
            })?;

        // stdin is closed before waiting so the CLI sees EOF.
        let written = child
            .stdin
            .take()
            .map_or(Ok(()), |mut stdin| stdin.write_all(input));

        let output = child.wait_with_output().map_err(|e| TestbedError::Io {
            path: self.binary.clone(),
            source: e,
        })?;
        if !output.status.success() {
            return Err(command_error(operation, &output));
        }
        written.map_err(|e| TestbedError::Io {
            path: self.binary.clone(),
            source: e,
        })
    }

    /// Best-effort removal of a container that failed to start.
    fn discard(&self, name: &str) {
        match self.run(&args(["rm", "--force", "--volumes", name])) {
            Ok(output) if output.status.success() => {
                tracing::debug!(name, "removed partially started container");
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::debug!(name, stderr = %stderr.trim(), "nothing to remove");
            }
            Err(e) => {
                tracing::warn!(name, error = %e, "failed to remove partially started container");
            }
        }
    }
}

impl ContainerRuntime for DockerCliRuntime {
    fn name(&self) -> &str {
        self.binary
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("docker")
    }

    fn start(&self, descriptor: &ResourceDescriptor) -> Result<InstanceId> {
        descriptor.validate()?;
        let name = format!("{APP_NAME}-{}", uuid::Uuid::new_v4().simple());
        tracing::info!(name = %name, image = descriptor.image(), "creating container");

        let output = match self.run_checked("run", &run_args(&name, &self.network, descriptor)) {
            Ok(output) => output,
            Err(e) => {
                self.discard(&name);
                return Err(e);
            }
        };

        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            self.discard(&name);
            return Err(TestbedError::Runtime {
                operation: "run",
                message: format!("{} returned no container id", self.name()),
            });
        }
        Ok(InstanceId::new(id))
    }

    fn stop(&self, id: &InstanceId) -> Result<()> {
        tracing::info!(id = %id, "removing container");
        let _ = self.run_checked("rm", &args(["rm", "--force", "--volumes", id.as_str()]))?;
        Ok(())
    }

    fn exec(&self, id: &InstanceId, command: &[String]) -> Result<ExecOutput> {
        if command.is_empty() {
            return Err(TestbedError::Config {
                message: "exec command is empty".into(),
            });
        }
        let mut argv = args(["exec", id.as_str()]);
        argv.extend(command.iter().cloned());
        let output = self.run(&argv)?;
        Ok(signal_exit_as_interrupt(exec::from_process_output(&output)))
    }

    fn copy_in(&self, id: &InstanceId, content: &[u8], mode: u32, dest: &str) -> Result<()> {
        let (dir, file_name) = archive::split_destination(dest)?;
        let tarball = archive::pack_file(file_name, content, mode)?;
        let target = format!("{id}:{dir}");
        self.run_with_stdin("cp", &args(["cp", "-", target.as_str()]), &tarball)
    }

    fn copy_out(&self, id: &InstanceId, src: &str, local_dest: &Path) -> Result<()> {
        let source = format!("{id}:{src}");
        let dest = local_dest.display().to_string();
        let _ = self.run_checked("cp", &args(["cp", source.as_str(), dest.as_str()]))?;
        Ok(())
    }

    fn network_address(&self, id: &InstanceId, network: &str) -> Result<String> {
        let output = self.run_checked(
            "inspect",
            &args([
                "inspect",
                "--format",
                "{{json .NetworkSettings.Networks}}",
                id.as_str(),
            ]),
        )?;
        parse_network_address(id, network, &String::from_utf8_lossy(&output.stdout))
    }

    fn is_available(&self) -> bool {
        self.run(&args(["version", "--format", "{{.Server.Version}}"]))
            .is_ok_and(|output| output.status.success())
    }
}

/// Builds the `run` argument list for a new detached container.
#[must_use]
pub fn run_args(name: &str, network: &str, descriptor: &ResourceDescriptor) -> Vec<String> {
    let mut argv = args(["run", "--detach", "--name", name]);
    if network != DEFAULT_NETWORK {
        argv.extend(args(["--network", network]));
    }
    for (key, value) in descriptor.environment() {
        argv.push("--env".into());
        argv.push(format!("{key}={value}"));
    }
    argv.push("--expose".into());
    argv.push(descriptor.port().to_string());
    argv.push(descriptor.image().to_string());
    argv
}

/// Extracts the IP address on `network` from the JSON of
/// `.NetworkSettings.Networks`.
///
/// # Errors
///
/// Returns [`TestbedError::AddressResolution`] if the network is absent or
/// has no address assigned.
pub fn parse_network_address(id: &InstanceId, network: &str, json: &str) -> Result<String> {
    let networks: serde_json::Value = serde_json::from_str(json.trim())?;
    let unresolved = |message: String| TestbedError::AddressResolution {
        instance: id.to_string(),
        network: network.to_string(),
        message,
    };

    let attachment = networks.get(network).ok_or_else(|| {
        let attached: Vec<&str> = networks
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default();
        unresolved(format!("not attached (attached to: {})", attached.join(", ")))
    })?;

    attachment
        .get("IPAddress")
        .and_then(serde_json::Value::as_str)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .ok_or_else(|| unresolved("no IP address assigned".into()))
}

/// The CLI reports a command killed inside the container as exit status
/// `128 + signal`.
fn signal_exit_as_interrupt(output: ExecOutput) -> ExecOutput {
    match output.exit_code {
        Some(code @ 129..=192) => ExecOutput {
            exit_code: None,
            signal: Some(code - 128),
            ..output
        },
        _ => output,
    }
}

fn args<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn command_error(operation: &'static str, output: &Output) -> TestbedError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = match output.status.code() {
        Some(code) => format!("exit status {code}: {}", stderr.trim()),
        None => format!("terminated by signal: {}", stderr.trim()),
    };
    TestbedError::Runtime { operation, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_args_include_env_port_and_image() {
        let descriptor = ResourceDescriptor::new("ftp:latest", 2121)
            .env("FTP_USER_NAME", "test")
            .env("A", "1");
        let argv = run_args("testbed-x", "bridge", &descriptor);
        assert_eq!(
            argv,
            vec![
                "run",
                "--detach",
                "--name",
                "testbed-x",
                "--env",
                "A=1",
                "--env",
                "FTP_USER_NAME=test",
                "--expose",
                "2121",
                "ftp:latest",
            ]
        );
    }

    #[test]
    fn run_args_attach_custom_network() {
        let descriptor = ResourceDescriptor::new("ftp", 21);
        let argv = run_args("n", "testnet", &descriptor);
        let pos = argv.iter().position(|a| a == "--network").expect("flag");
        assert_eq!(argv[pos + 1], "testnet");
    }

    #[test]
    fn network_address_is_parsed() {
        let json = r#"{"bridge":{"IPAddress":"172.17.0.3","Gateway":"172.17.0.1"}}"#;
        let ip = parse_network_address(&InstanceId::new("abc"), "bridge", json).expect("ip");
        assert_eq!(ip, "172.17.0.3");
    }

    #[test]
    fn missing_network_is_address_resolution_error() {
        let json = r#"{"testnet":{"IPAddress":"10.0.0.2"}}"#;
        let err = parse_network_address(&InstanceId::new("abc"), "bridge", json).expect_err("absent");
        match err {
            TestbedError::AddressResolution { message, .. } => assert!(message.contains("testnet")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_ip_is_address_resolution_error() {
        let json = r#"{"bridge":{"IPAddress":""}}"#;
        let err = parse_network_address(&InstanceId::new("abc"), "bridge", json).expect_err("empty");
        assert!(matches!(err, TestbedError::AddressResolution { .. }));
    }

    #[test]
    fn signal_exit_status_is_interrupt() {
        let killed = signal_exit_as_interrupt(ExecOutput::exited(137, "", ""));
        assert!(killed.was_interrupted());
        assert_eq!(killed.signal, Some(9));

        let failed = signal_exit_as_interrupt(ExecOutput::exited(1, "", "exists"));
        assert_eq!(failed.exit_code, Some(1));
        assert!(!failed.was_interrupted());
    }

    #[test]
    fn name_is_binary_file_name() {
        let runtime = DockerCliRuntime::new("/usr/bin/podman", "bridge");
        assert_eq!(runtime.name(), "podman");
    }

    #[test]
    fn missing_binary_is_io_error() {
        let runtime = DockerCliRuntime::new("/nonexistent/testbed-no-such-cli", "bridge");
        assert!(!runtime.is_available());
        let err = runtime
            .exec(&InstanceId::new("abc"), &["true".to_string()])
            .expect_err("no binary");
        assert!(matches!(err, TestbedError::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn early_exit_reports_stderr_not_broken_pipe() {
        let runtime = DockerCliRuntime::new("sh", "bridge");
        let input = vec![0_u8; 4 * 1024 * 1024];
        let err = runtime
            .run_with_stdin(
                "cp",
                &args(["-c", "echo 'no such container' >&2; exit 3"]),
                &input,
            )
            .expect_err("non-zero exit");
        match err {
            TestbedError::Runtime { operation, message } => {
                assert_eq!(operation, "cp");
                assert!(message.contains("exit status 3"), "{message}");
                assert!(message.contains("no such container"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn stdin_is_fully_delivered() {
        let runtime = DockerCliRuntime::new("sh", "bridge");
        runtime
            .run_with_stdin("cp", &args(["-c", "cat > /dev/null"]), b"payload")
            .expect("consumed");
    }

    #[test]
    fn empty_exec_command_is_rejected() {
        let runtime = DockerCliRuntime::new("docker", "bridge");
        let err = runtime.exec(&InstanceId::new("abc"), &[]).expect_err("empty");
        assert!(matches!(err, TestbedError::Config { .. }));
    }
}
