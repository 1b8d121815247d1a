//! Description of the workload a test runs against a resource.
//!
//! The testbed never interprets these contents; it only carries them to
//! whatever executes the system under test.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SOURCE_NAME;

/// A named source artifact plus its key/value configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadDescriptor {
    source_name: String,
    source: String,
    properties: BTreeMap<String, String>,
}

impl WorkloadDescriptor {
    /// Creates a workload using the default source name.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self::named(DEFAULT_SOURCE_NAME, source)
    }

    /// Creates a workload with an explicit source name.
    #[must_use]
    pub fn named(source_name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            source: source.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Adds a configuration property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.properties.insert(key.into(), value.into());
        self
    }

    /// Name of the source artifact.
    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Source artifact contents.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Configuration properties.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}
