//! Lifecycle contract shared by every deployable resource.

use std::ops::{Deref, DerefMut};

use testbed_common::error::Result;
use testbed_common::types::ResourceState;

/// A backing service whose lifecycle is managed by a test.
///
/// A resource is either undeployed or deployed with exactly one live
/// instance. `deploy` and `undeploy` block until the transition is complete
/// and never expose an intermediate state.
pub trait Deployable {
    /// Name of the implementation, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Starts the backing service and waits until it accepts connections.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyDeployed` if a live instance exists, or the start
    /// failure after any partially started instance has been torn down.
    fn deploy(&mut self) -> Result<()>;

    /// Stops the backing service. A no-op when already undeployed.
    ///
    /// # Errors
    ///
    /// Returns the runtime's stop error. The resource is undeployed
    /// afterwards either way.
    fn undeploy(&mut self) -> Result<()>;

    /// Current lifecycle state.
    fn state(&self) -> ResourceState;

    /// Returns `true` while a live instance exists.
    fn is_deployed(&self) -> bool {
        self.state() == ResourceState::Deployed
    }
}

/// Deploys `resource` and returns a guard that undeploys it when dropped.
///
/// # Errors
///
/// Returns the resource's deploy error; nothing needs tearing down then.
pub fn deploy_scoped<R: Deployable + ?Sized>(resource: &mut R) -> Result<Deployment<'_, R>> {
    resource.deploy()?;
    Ok(Deployment {
        resource,
        armed: true,
    })
}

/// Scoped ownership of a deployed resource.
///
/// Dropping the guard undeploys best-effort, logging failures, so teardown
/// after a failed assertion never panics. Call [`Deployment::finish`] on the
/// success path to surface teardown errors.
pub struct Deployment<'a, R: Deployable + ?Sized> {
    resource: &'a mut R,
    armed: bool,
}

impl<R: Deployable + ?Sized> Deployment<'_, R> {
    /// Undeploys the resource and reports the outcome.
    ///
    /// # Errors
    ///
    /// Returns the resource's undeploy error.
    pub fn finish(mut self) -> Result<()> {
        self.armed = false;
        self.resource.undeploy()
    }
}

impl<R: Deployable + ?Sized> Deref for Deployment<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        &*self.resource
    }
}

impl<R: Deployable + ?Sized> DerefMut for Deployment<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut *self.resource
    }
}

impl<R: Deployable + ?Sized> Drop for Deployment<'_, R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let name = self.resource.name();
        if let Err(e) = self.resource.undeploy() {
            tracing::warn!(resource = name, error = %e, "teardown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use testbed_common::error::TestbedError;

    use super::*;

    #[derive(Default)]
    struct Counter {
        deployed: bool,
        deploys: u32,
        undeploys: u32,
        fail_undeploy: bool,
    }

    impl Deployable for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn deploy(&mut self) -> Result<()> {
            if self.deployed {
                return Err(TestbedError::AlreadyDeployed {
                    resource: "counter",
                    instance: "c".into(),
                });
            }
            self.deployed = true;
            self.deploys += 1;
            Ok(())
        }

        fn undeploy(&mut self) -> Result<()> {
            if !self.deployed {
                return Ok(());
            }
            self.deployed = false;
            self.undeploys += 1;
            if self.fail_undeploy {
                return Err(TestbedError::Runtime {
                    operation: "rm",
                    message: "gone".into(),
                });
            }
            Ok(())
        }

        fn state(&self) -> ResourceState {
            if self.deployed {
                ResourceState::Deployed
            } else {
                ResourceState::Undeployed
            }
        }
    }

    #[test]
    fn dropping_guard_undeploys() {
        let mut counter = Counter::default();
        {
            let guard = deploy_scoped(&mut counter).expect("deploy");
            assert!(guard.is_deployed());
        }
        assert!(!counter.is_deployed());
        assert_eq!(counter.undeploys, 1);
    }

    #[test]
    fn finish_surfaces_teardown_error() {
        let mut counter = Counter {
            fail_undeploy: true,
            ..Counter::default()
        };
        let guard = deploy_scoped(&mut counter).expect("deploy");
        assert!(guard.finish().is_err());
        assert_eq!(counter.undeploys, 1);
    }

    #[test]
    fn drop_swallows_teardown_error() {
        let mut counter = Counter {
            fail_undeploy: true,
            ..Counter::default()
        };
        drop(deploy_scoped(&mut counter).expect("deploy"));
        assert_eq!(counter.undeploys, 1);
        assert!(!counter.is_deployed());
    }

    #[test]
    fn failed_deploy_returns_no_guard() {
        let mut counter = Counter {
            deployed: true,
            ..Counter::default()
        };
        assert!(deploy_scoped(&mut counter).is_err());
        assert_eq!(counter.undeploys, 0);
    }
}
