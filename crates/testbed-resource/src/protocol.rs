//! Real-protocol access to an FTP resource.
//!
//! A thin wrapper over `suppaftp`. It holds no bypass logic: everything here
//! travels over the FTP control and data connections, in passive mode, the
//! way the system under test talks to the server.

use std::io::Cursor;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use suppaftp::FtpStream;
use suppaftp::types::FileType;
use testbed_common::error::{Result, TestbedError};
use testbed_common::types::{Address, Credentials};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection parameters for an FTP resource.
#[derive(Debug, Clone)]
pub struct FtpProtocolClient {
    address: Address,
    credentials: Credentials,
    working_directory: Option<String>,
    connect_timeout: Duration,
}

impl FtpProtocolClient {
    /// Creates a client for the server at `address`.
    ///
    /// Sessions start in the user's login directory, which is the resource
    /// root bypass targets are relative to.
    #[must_use]
    pub const fn new(address: Address, credentials: Credentials) -> Self {
        Self {
            address,
            credentials,
            working_directory: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Changes into `dir` after login, for servers whose login directory is
    /// not the resource root.
    #[must_use]
    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Sets the TCP connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Address sessions connect to.
    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }

    /// Opens a logged-in binary-mode session.
    ///
    /// # Errors
    ///
    /// Returns [`TestbedError::Protocol`] if the server is unreachable or
    /// rejects the login.
    pub fn connect(&self) -> Result<FtpSession> {
        let addr = self.socket_addr()?;
        tracing::debug!(address = %self.address, user = %self.credentials.username, "connecting");

        let mut stream = FtpStream::connect_timeout(addr, self.connect_timeout)
            .map_err(|e| protocol_error("connect", &e))?;
        stream
            .login(
                self.credentials.username.as_str(),
                self.credentials.password.as_str(),
            )
            .map_err(|e| protocol_error("login", &e))?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| protocol_error("type", &e))?;
        if let Some(dir) = &self.working_directory {
            stream.cwd(dir).map_err(|e| protocol_error("cwd", &e))?;
        }
        Ok(FtpSession { stream })
    }

    fn socket_addr(&self) -> Result<SocketAddr> {
        (self.address.host.as_str(), self.address.port)
            .to_socket_addrs()
            .map_err(|e| TestbedError::Protocol {
                operation: "connect",
                message: format!("cannot resolve {}: {e}", self.address),
            })?
            .next()
            .ok_or_else(|| TestbedError::Protocol {
                operation: "connect",
                message: format!("{} resolved to no addresses", self.address),
            })
    }
}

/// An open FTP session.
pub struct FtpSession {
    stream: FtpStream,
}

impl FtpSession {
    /// Lists `path` (or the working directory) in the server's long format.
    ///
    /// # Errors
    ///
    /// Returns [`TestbedError::Protocol`] on failure.
    pub fn list(&mut self, path: Option<&str>) -> Result<Vec<String>> {
        self.stream.list(path).map_err(|e| protocol_error("LIST", &e))
    }

    /// Lists the bare names in `path` (or the working directory).
    ///
    /// # Errors
    ///
    /// Returns [`TestbedError::Protocol`] on failure.
    pub fn names(&mut self, path: Option<&str>) -> Result<Vec<String>> {
        self.stream.nlst(path).map_err(|e| protocol_error("NLST", &e))
    }

    /// Downloads `name`.
    ///
    /// # Errors
    ///
    /// Returns [`TestbedError::Protocol`] on failure.
    pub fn retrieve(&mut self, name: &str) -> Result<Vec<u8>> {
        self.stream
            .retr_as_buffer(name)
            .map(Cursor::into_inner)
            .map_err(|e| protocol_error("RETR", &e))
    }

    /// Uploads `content` to `name`, returning the bytes sent.
    ///
    /// # Errors
    ///
    /// Returns [`TestbedError::Protocol`] on failure.
    pub fn store(&mut self, name: &str, content: &[u8]) -> Result<u64> {
        let mut reader = Cursor::new(content);
        self.stream
            .put_file(name, &mut reader)
            .map_err(|e| protocol_error("STOR", &e))
    }

    /// Creates directory `name`.
    ///
    /// # Errors
    ///
    /// Returns [`TestbedError::Protocol`] on failure.
    pub fn make_directory(&mut self, name: &str) -> Result<()> {
        self.stream.mkdir(name).map_err(|e| protocol_error("MKD", &e))
    }

    /// Current working directory.
    ///
    /// # Errors
    ///
    /// Returns [`TestbedError::Protocol`] on failure.
    pub fn working_directory(&mut self) -> Result<String> {
        self.stream.pwd().map_err(|e| protocol_error("PWD", &e))
    }

    /// Ends the session.
    ///
    /// # Errors
    ///
    /// Returns [`TestbedError::Protocol`] if the server does not acknowledge.
    pub fn quit(mut self) -> Result<()> {
        self.stream.quit().map_err(|e| protocol_error("QUIT", &e))
    }
}

fn protocol_error(operation: &'static str, err: &suppaftp::FtpError) -> TestbedError {
    TestbedError::Protocol {
        operation,
        message: err.to_string(),
    }
}
