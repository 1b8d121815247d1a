//! System-wide constants and defaults.

/// Application name used as a prefix for instance names and log targets.
pub const APP_NAME: &str = "testbed";

/// Container CLIs searched on `PATH`, in order of preference.
pub const RUNTIME_BINARIES: &[&str] = &["docker", "podman"];

/// Network whose address is resolved for deployed instances.
pub const DEFAULT_NETWORK: &str = "bridge";

/// Seconds `deploy()` waits for the service to accept connections.
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 60;

/// Milliseconds between readiness checks.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Image used by the local FTP resource.
pub const DEFAULT_FTP_IMAGE: &str = "docker.io/stilliard/pure-ftpd:latest";

/// Control port the local FTP server listens on.
pub const DEFAULT_FTP_PORT: u16 = 2121;

/// Default FTP user name.
pub const DEFAULT_FTP_USERNAME: &str = "test";

/// Default FTP password.
pub const DEFAULT_FTP_PASSWORD: &str = "test";

/// Root directory served to the FTP user inside the environment.
pub const DEFAULT_FTP_BASE_PATH: &str = "/home/ftpusers/test";

/// Permission bits applied to every artifact written through the bypass path.
pub const WORLD_RWX: u32 = 0o777;

/// Source name used when a workload does not name its source artifact.
pub const DEFAULT_SOURCE_NAME: &str = "MyRouteBuilder.java";

/// Capability key of FTP-capable endpoints in the registry.
pub const FTP_CAPABILITY: &str = "ftp";

/// Environment variable naming a JSON configuration file.
pub const ENV_CONFIG_FILE: &str = "TESTBED_CONFIG";
/// Environment variable overriding the container CLI binary.
pub const ENV_RUNTIME: &str = "TESTBED_RUNTIME";
/// Environment variable overriding the network name.
pub const ENV_NETWORK: &str = "TESTBED_NETWORK";
/// Environment variable selecting the FTP implementation.
pub const ENV_FTP_IMPL: &str = "TESTBED_FTP_IMPL";
/// Environment variable overriding the FTP image.
pub const ENV_FTP_IMAGE: &str = "TESTBED_FTP_IMAGE";
/// Environment variable overriding the startup timeout.
pub const ENV_STARTUP_TIMEOUT: &str = "TESTBED_STARTUP_TIMEOUT_SECS";
/// Selects the log output format: `text` (default) or `json`.
pub const ENV_LOG_FORMAT: &str = "TESTBED_LOG_FORMAT";
