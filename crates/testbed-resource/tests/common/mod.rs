//! In-memory container runtime shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use testbed_common::config::TestbedConfig;
use testbed_common::constants::DEFAULT_FTP_BASE_PATH;
use testbed_common::error::{Result, TestbedError};
use testbed_common::types::{InstanceId, ResourceDescriptor, WaitStrategy};
use testbed_resource::ftp::LocalFtp;
use testbed_resource::ftp::local::descriptor_from_config;
use testbed_runtime::exec::ExecOutput;
use testbed_runtime::runtime::ContainerRuntime;

/// One simulated instance: a flat map of files and a set of directories.
#[derive(Debug, Clone, Default)]
pub struct MockInstance {
    pub descriptor: Option<ResourceDescriptor>,
    pub host: String,
    pub files: BTreeMap<String, (Vec<u8>, u32)>,
    pub dirs: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct State {
    next: u32,
    live: BTreeMap<String, MockInstance>,
    stopped: Vec<String>,
    fail_start_image: Option<String>,
    fail_stop: bool,
    interrupt_exec: Option<i32>,
    fixed_host: Option<String>,
    exec_log: Vec<Vec<String>>,
}

/// Runtime double. Instances get hosts `127.0.0.<n>` on the `bridge` network
/// unless a fixed host is set, and start with the default FTP base path.
#[derive(Debug, Default)]
pub struct MockRuntime {
    state: Mutex<State>,
}

impl MockRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn fail_start_for(&self, image: &str) {
        self.state().fail_start_image = Some(image.to_owned());
    }

    pub fn fail_stop(&self, fail: bool) {
        self.state().fail_stop = fail;
    }

    pub fn interrupt_exec(&self, signal: Option<i32>) {
        self.state().interrupt_exec = signal;
    }

    pub fn use_fixed_host(&self, host: &str) {
        self.state().fixed_host = Some(host.to_owned());
    }

    pub fn live_count(&self) -> usize {
        self.state().live.len()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.state().stopped.clone()
    }

    pub fn instance(&self, id: &str) -> Option<MockInstance> {
        self.state().live.get(id).cloned()
    }

    pub fn only_instance(&self) -> MockInstance {
        let state = self.state();
        assert_eq!(state.live.len(), 1, "expected exactly one live instance");
        state.live.values().next().cloned().unwrap()
    }

    pub fn live_ids(&self) -> Vec<String> {
        self.state().live.keys().cloned().collect()
    }

    pub fn exec_log(&self) -> Vec<Vec<String>> {
        self.state().exec_log.clone()
    }

    /// Places a file directly in an instance, bypassing every client.
    pub fn put_file(&self, id: &str, path: &str, content: &[u8]) {
        let mut state = self.state();
        let instance = state.live.get_mut(id).unwrap();
        let _ = instance.files.insert(path.to_owned(), (content.to_vec(), 0o644));
    }

    fn with_instance<T>(
        &self,
        id: &InstanceId,
        f: impl FnOnce(&mut MockInstance) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state();
        let instance = state
            .live
            .get_mut(id.as_str())
            .ok_or_else(|| TestbedError::NotFound {
                kind: "instance",
                id: id.to_string(),
            })?;
        f(instance)
    }
}

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => ".",
    }
}

fn ancestors(path: &str) -> BTreeSet<String> {
    let mut dirs = BTreeSet::new();
    let mut current = path.trim_end_matches('/').to_owned();
    while !current.is_empty() {
        let _ = dirs.insert(current.clone());
        current = match current.rfind('/') {
            Some(0) | None => String::new(),
            Some(i) => current[..i].to_owned(),
        };
    }
    let _ = dirs.insert("/".to_owned());
    dirs
}

impl ContainerRuntime for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    fn start(&self, descriptor: &ResourceDescriptor) -> Result<InstanceId> {
        descriptor.validate()?;
        let mut state = self.state();
        if state.fail_start_image.as_deref() == Some(descriptor.image()) {
            return Err(TestbedError::Runtime {
                operation: "run",
                message: format!("pull access denied for {}", descriptor.image()),
            });
        }
        state.next += 1;
        let id = format!("mock-{}", state.next);
        let host = state
            .fixed_host
            .clone()
            .unwrap_or_else(|| format!("127.0.0.{}", state.next + 1));
        let instance = MockInstance {
            descriptor: Some(descriptor.clone()),
            host,
            files: BTreeMap::new(),
            dirs: ancestors(DEFAULT_FTP_BASE_PATH),
        };
        let _ = state.live.insert(id.clone(), instance);
        Ok(InstanceId::new(id))
    }

    fn stop(&self, id: &InstanceId) -> Result<()> {
        let mut state = self.state();
        let _ = state.live.remove(id.as_str());
        state.stopped.push(id.to_string());
        if state.fail_stop {
            return Err(TestbedError::Runtime {
                operation: "rm",
                message: "daemon not responding".into(),
            });
        }
        Ok(())
    }

    fn exec(&self, id: &InstanceId, command: &[String]) -> Result<ExecOutput> {
        let interrupt = {
            let mut state = self.state();
            state.exec_log.push(command.to_vec());
            state.interrupt_exec
        };
        if interrupt.is_some() {
            return Ok(ExecOutput::interrupted(interrupt));
        }
        self.with_instance(id, |instance| match command {
            [mkdir, flag, _, path] if mkdir == "mkdir" && flag == "-m" => {
                if instance.dirs.contains(path) || instance.files.contains_key(path) {
                    return Ok(ExecOutput::exited(
                        1,
                        "",
                        format!("mkdir: cannot create directory '{path}': File exists"),
                    ));
                }
                if !instance.dirs.contains(parent(path)) {
                    return Ok(ExecOutput::exited(
                        1,
                        "",
                        format!("mkdir: cannot create directory '{path}': No such file or directory"),
                    ));
                }
                let _ = instance.dirs.insert(path.clone());
                Ok(ExecOutput::exited(0, "", ""))
            }
            _ => Ok(ExecOutput::exited(127, "", "command not found")),
        })
    }

    fn copy_in(&self, id: &InstanceId, content: &[u8], mode: u32, dest: &str) -> Result<()> {
        self.with_instance(id, |instance| {
            if !instance.dirs.contains(parent(dest)) {
                return Err(TestbedError::Runtime {
                    operation: "cp",
                    message: format!("could not find the file {} in container", parent(dest)),
                });
            }
            let _ = instance
                .files
                .insert(dest.to_owned(), (content.to_vec(), mode));
            Ok(())
        })
    }

    fn copy_out(&self, id: &InstanceId, src: &str, local_dest: &Path) -> Result<()> {
        let content = self.with_instance(id, |instance| {
            instance
                .files
                .get(src)
                .map(|(content, _)| content.clone())
                .ok_or_else(|| TestbedError::Runtime {
                    operation: "cp",
                    message: format!("could not find the file {src} in container"),
                })
        })?;
        std::fs::write(local_dest, content).map_err(|e| TestbedError::Io {
            path: local_dest.to_path_buf(),
            source: e,
        })
    }

    fn network_address(&self, id: &InstanceId, network: &str) -> Result<String> {
        self.with_instance(id, |instance| {
            if network == "bridge" {
                Ok(instance.host.clone())
            } else {
                Err(TestbedError::AddressResolution {
                    instance: id.to_string(),
                    network: network.to_owned(),
                    message: "not attached".into(),
                })
            }
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// A local FTP resource on `runtime` that skips the readiness check.
pub fn local_ftp(runtime: &Arc<MockRuntime>, config: &TestbedConfig) -> LocalFtp {
    let descriptor = descriptor_from_config(config).wait(WaitStrategy::Immediate);
    LocalFtp::with_descriptor(
        Arc::clone(runtime) as Arc<dyn ContainerRuntime>,
        config,
        descriptor,
    )
}
