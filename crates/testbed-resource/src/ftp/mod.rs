//! FTP resources.
//!
//! Two implementations share the [`FtpEndpoint`] contract:
//! - [`LocalFtp`] starts a throwaway server in a container for each deploy;
//! - [`RemoteFtp`] attaches to a server managed outside the test run.

pub mod local;
pub mod remote;

use testbed_common::error::Result;
use testbed_common::types::{Address, Credentials};

use crate::bypass::BypassClient;
use crate::deployable::Deployable;
use crate::protocol::FtpProtocolClient;

pub use local::LocalFtp;
pub use remote::RemoteFtp;

/// A deployable FTP server.
///
/// Every accessor requires the resource to be deployed and fails with
/// `NotDeployed` otherwise. Paths given to the bypass client are relative to
/// the login directory, so a file stored as `hello.txt` is listed as
/// `hello.txt` by a protocol session.
pub trait FtpEndpoint: Deployable + Send {
    /// Address the system under test connects to.
    ///
    /// # Errors
    ///
    /// Returns `NotDeployed`, or `AddressResolution` if the host cannot be
    /// determined.
    fn address(&self) -> Result<Address>;

    /// Login credentials.
    fn credentials(&self) -> Credentials;

    /// Out-of-band access to the served directory.
    ///
    /// # Errors
    ///
    /// Returns `NotDeployed`.
    fn bypass_client(&self) -> Result<Box<dyn BypassClient>>;

    /// Real-protocol client for the deployed server.
    ///
    /// # Errors
    ///
    /// Returns `NotDeployed`.
    fn protocol_client(&self) -> Result<FtpProtocolClient> {
        Ok(FtpProtocolClient::new(self.address()?, self.credentials()))
    }
}
