//! # testbed-resource
//!
//! Deployable network resources for integration tests.
//!
//! A resource is deployed, addressed, and torn down through the
//! [`Deployable`](deployable::Deployable) lifecycle. Each resource exposes two
//! clients over the same storage:
//! - a [`BypassClient`](bypass::BypassClient) that moves data through the
//!   runtime's copy and exec primitives, for priming fixtures and asserting
//!   results;
//! - a [`FtpProtocolClient`](protocol::FtpProtocolClient) that speaks the real
//!   wire protocol, exactly as the system under test does.
//!
//! Implementations are selected through a [`ResourceRegistry`](registry::ResourceRegistry).
//!
//! # Example
//!
//! ```rust,no_run
//! use testbed_common::config::TestbedConfig;
//! use testbed_resource::deployable::deploy_scoped;
//! use testbed_resource::registry::ftp_registry;
//!
//! # fn main() -> testbed_common::error::Result<()> {
//! let config = TestbedConfig::load()?;
//! let selection = ftp_registry().resolve(&config)?;
//! let mut ftp = selection.create()?;
//!
//! let deployment = deploy_scoped(&mut *ftp)?;
//! deployment.bypass_client()?.store_file("hello.txt", b"abc")?;
//! let address = deployment.address()?;
//! tracing::info!(%address, "system under test connects here");
//! deployment.finish()?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod bypass;
pub mod deployable;
pub mod ftp;
pub mod logging;
pub mod protocol;
pub mod registry;
