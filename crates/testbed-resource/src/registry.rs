//! Configuration-time selection of resource implementations.
//!
//! A registry maps one capability, such as `ftp`, to the implementations that
//! provide it. [`ResourceRegistry::resolve`] picks one for the whole test run
//! and returns a [`Selection`] that keeps creating that implementation.

use std::fmt;

use testbed_common::config::TestbedConfig;
use testbed_common::constants::FTP_CAPABILITY;
use testbed_common::error::{Result, TestbedError};

use crate::ftp::{FtpEndpoint, LocalFtp, RemoteFtp};

/// Builds an implementation from the run configuration.
pub type Factory<R> = Box<dyn Fn(&TestbedConfig) -> Result<Box<R>> + Send + Sync>;

struct Registration<R: ?Sized> {
    name: String,
    priority: i32,
    factory: Factory<R>,
}

/// Implementations registered for one capability.
pub struct ResourceRegistry<R: ?Sized> {
    capability: String,
    registrations: Vec<Registration<R>>,
}

impl<R: ?Sized> ResourceRegistry<R> {
    /// Creates an empty registry for `capability`.
    #[must_use]
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            registrations: Vec::new(),
        }
    }

    /// Registers an implementation.
    ///
    /// Without an explicit configuration entry, the highest `priority` wins;
    /// ties go to the earliest registration.
    ///
    /// # Errors
    ///
    /// Returns [`TestbedError::Config`] if `name` is already registered.
    pub fn register<F>(&mut self, name: impl Into<String>, priority: i32, factory: F) -> Result<()>
    where
        F: Fn(&TestbedConfig) -> Result<Box<R>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.registrations.iter().any(|r| r.name == name) {
            return Err(TestbedError::Config {
                message: format!(
                    "implementation {name:?} is already registered for {}",
                    self.capability
                ),
            });
        }
        self.registrations.push(Registration {
            name,
            priority,
            factory: Box::new(factory),
        });
        Ok(())
    }

    /// Registered implementation names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.registrations.iter().map(|r| r.name.as_str()).collect()
    }

    /// Chooses the implementation for this run.
    ///
    /// The same registry and configuration always yield the same selection.
    ///
    /// # Errors
    ///
    /// Returns [`TestbedError::NotFound`] if the configured name is not
    /// registered, or if the registry is empty.
    pub fn resolve(self, config: &TestbedConfig) -> Result<Selection<R>> {
        let Self {
            capability,
            registrations,
        } = self;

        let chosen = match config.implementation(&capability) {
            Some(wanted) => registrations
                .into_iter()
                .find(|r| r.name == wanted)
                .ok_or_else(|| TestbedError::NotFound {
                    kind: "resource implementation",
                    id: format!("{capability}/{wanted}"),
                })?,
            None => registrations
                .into_iter()
                .rev()
                .max_by_key(|r| r.priority)
                .ok_or_else(|| TestbedError::NotFound {
                    kind: "resource implementation",
                    id: format!("{capability} (nothing registered)"),
                })?,
        };

        tracing::info!(
            capability = %capability,
            implementation = %chosen.name,
            "resource implementation selected"
        );
        Ok(Selection {
            capability,
            registration: chosen,
            config: config.clone(),
        })
    }
}

impl<R: ?Sized> fmt::Debug for ResourceRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("capability", &self.capability)
            .field("implementations", &self.names())
            .finish()
    }
}

/// The implementation chosen for a test run.
pub struct Selection<R: ?Sized> {
    capability: String,
    registration: Registration<R>,
    config: TestbedConfig,
}

impl<R: ?Sized> Selection<R> {
    /// Name of the chosen implementation.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.registration.name
    }

    /// Creates a new, undeployed instance of the chosen implementation.
    ///
    /// # Errors
    ///
    /// Returns the factory's error, e.g. a missing runtime.
    pub fn create(&self) -> Result<Box<R>> {
        tracing::debug!(
            capability = %self.capability,
            implementation = %self.registration.name,
            "creating resource"
        );
        (self.registration.factory)(&self.config)
    }
}

impl<R: ?Sized> fmt::Debug for Selection<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("capability", &self.capability)
            .field("implementation", &self.registration.name)
            .finish_non_exhaustive()
    }
}

/// Registry with the built-in FTP implementations.
///
/// `local` runs a containerized server and is the default. `remote` attaches
/// to `ftp.remote` and is used when selected explicitly.
#[must_use]
pub fn ftp_registry() -> ResourceRegistry<dyn FtpEndpoint> {
    let mut registry = ResourceRegistry::new(FTP_CAPABILITY);
    let builtins: [(&str, i32, Factory<dyn FtpEndpoint>); 2] = [
        (
            "local",
            0,
            Box::new(|config: &TestbedConfig| {
                Ok(Box::new(LocalFtp::from_config(config)?) as Box<dyn FtpEndpoint>)
            }),
        ),
        (
            "remote",
            -10,
            Box::new(|config: &TestbedConfig| {
                Ok(Box::new(RemoteFtp::from_config(config)?) as Box<dyn FtpEndpoint>)
            }),
        ),
    ];
    for (name, priority, factory) in builtins {
        registry.registrations.push(Registration {
            name: name.into(),
            priority,
            factory,
        });
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named {
        fn label(&self) -> &'static str;
    }

    struct A;
    struct B;

    impl Named for A {
        fn label(&self) -> &'static str {
            "a"
        }
    }

    impl Named for B {
        fn label(&self) -> &'static str {
            "b"
        }
    }

    fn registry(priority_a: i32, priority_b: i32) -> ResourceRegistry<dyn Named> {
        let mut registry = ResourceRegistry::<dyn Named>::new("thing");
        registry
            .register("a", priority_a, |_| Ok(Box::new(A) as Box<dyn Named>))
            .unwrap();
        registry
            .register("b", priority_b, |_| Ok(Box::new(B) as Box<dyn Named>))
            .unwrap();
        registry
    }

    #[test]
    fn highest_priority_wins_by_default() {
        let selection = registry(0, 5).resolve(&TestbedConfig::default()).unwrap();
        assert_eq!(selection.name(), "b");
        assert_eq!(selection.create().unwrap().label(), "b");
    }

    #[test]
    fn ties_go_to_first_registration() {
        let selection = registry(3, 3).resolve(&TestbedConfig::default()).unwrap();
        assert_eq!(selection.name(), "a");
    }

    #[test]
    fn explicit_configuration_overrides_priority() {
        let mut config = TestbedConfig::default();
        let _ = config.implementations.insert("thing".into(), "a".into());
        let selection = registry(0, 5).resolve(&config).unwrap();
        assert_eq!(selection.name(), "a");
    }

    #[test]
    fn unknown_configured_name_is_not_found() {
        let mut config = TestbedConfig::default();
        let _ = config.implementations.insert("thing".into(), "c".into());
        assert!(matches!(
            registry(0, 0).resolve(&config),
            Err(TestbedError::NotFound { .. })
        ));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = registry(0, 0);
        let err = registry
            .register("a", 1, |_| Ok(Box::new(A) as Box<dyn Named>))
            .unwrap_err();
        assert!(matches!(err, TestbedError::Config { .. }));
        assert_eq!(registry.names(), ["a", "b"]);
    }

    #[test]
    fn empty_registry_is_not_found() {
        let registry = ResourceRegistry::<dyn Named>::new("thing");
        assert!(registry.resolve(&TestbedConfig::default()).is_err());
    }

    #[test]
    fn ftp_registry_defaults_to_local() {
        let registry = ftp_registry();
        assert_eq!(registry.names(), ["local", "remote"]);
        let selection = registry.resolve(&TestbedConfig::default()).unwrap();
        assert_eq!(selection.name(), "local");
    }
}
