//! Container runtime collaborator for the testbed.
//!
//! Defines the [`ContainerRuntime`](runtime::ContainerRuntime) primitives a
//! deployable resource is built on, the shared
//! [`RuntimeInstance`](runtime::RuntimeInstance) handle, and a backend that
//! drives the `docker` or `podman` CLI.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod archive;
pub mod backend;
pub mod exec;
pub mod runtime;
pub mod wait;
