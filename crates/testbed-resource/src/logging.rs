//! Log output for test runs.

use testbed_common::constants::ENV_LOG_FORMAT;
use tracing_subscriber::EnvFilter;

/// Shape of emitted log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a `TESTBED_LOG_FORMAT` value. Unknown values fall back to text.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }

    fn from_env() -> Self {
        std::env::var(ENV_LOG_FORMAT)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }
}

/// Installs the test subscriber, once per process.
///
/// Honors `RUST_LOG` (default `info`) and `TESTBED_LOG_FORMAT`. Output goes
/// through the test harness so it is captured per test. Later calls are
/// no-ops, so every test may call this.
pub fn init_test_logging() {
    init_logging(LogFormat::from_env());
}

/// Installs a test subscriber with an explicit format. See
/// [`init_test_logging`].
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer();
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if installed.is_ok() {
        tracing::debug!(?format, "test logging installed");
    }
}
