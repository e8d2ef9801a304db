//! In-memory implementation of `Platform`.
//!
//! Holds a fake package list and grant set, records every call, and can be
//! switched into failure modes so that the registry, evaluator and request
//! flow can be exercised without a device.

use std::collections::HashSet;
use std::sync::Mutex;

use super::{InstalledPackage, Platform, PlatformError};
use crate::permissions::Permission;

// ---------------------------------------------------------------------------
// Call recording
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    InstalledPackages,
    IsGranted(Permission),
    LaunchGrant(Permission),
    PersistGrant(Permission),
    ReleaseGrant(Permission),
}

// ---------------------------------------------------------------------------
// Simulated state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<PlatformCall>,
    installed: Vec<InstalledPackage>,
    granted: HashSet<Permission>,
    // Behavior overrides for edge cases
    fail_queries: bool,
    fail_launch: bool,
    fail_persist: bool,
    refuse_release: bool,
}

#[derive(Debug, Default)]
pub struct SimulatedPlatform {
    inner: Mutex<Inner>,
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-install a package.
    pub fn with_package(self, id: &str) -> Self {
        self.install(id);
        self
    }

    /// Pre-grant a permission.
    pub fn with_grant(self, permission: Permission) -> Self {
        self.grant(permission);
        self
    }

    /// Make package and grant queries fail.
    pub fn fail_queries(self) -> Self {
        self.set_fail_queries(true);
        self
    }

    /// Make `launch_grant` fail.
    pub fn fail_launch(self) -> Self {
        self.lock().fail_launch = true;
        self
    }

    /// Make `persist_grant` fail.
    pub fn fail_persist(self) -> Self {
        self.lock().fail_persist = true;
        self
    }

    /// Make `release_grant` answer with a refusal.
    pub fn refuse_release(self) -> Self {
        self.lock().refuse_release = true;
        self
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.lock().fail_queries = fail;
    }

    pub fn install(&self, id: &str) {
        let mut inner = self.lock();
        if !inner.installed.iter().any(|p| p.id == id) {
            inner.installed.push(InstalledPackage::new(id));
        }
    }

    pub fn uninstall(&self, id: &str) {
        self.lock().installed.retain(|p| p.id != id);
    }

    /// Grant from outside the app, e.g. through system settings.
    pub fn grant(&self, permission: Permission) {
        self.lock().granted.insert(permission);
    }

    /// Revoke from outside the app, e.g. through system settings.
    pub fn revoke(&self, permission: &Permission) {
        self.lock().granted.remove(permission);
    }

    pub fn holds(&self, permission: &Permission) -> bool {
        self.lock().granted.contains(permission)
    }

    /// Get recorded calls for assertions.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.lock().calls.clone()
    }

    /// Check if a specific call was made.
    pub fn was_called(&self, call: &PlatformCall) -> bool {
        self.lock().calls.contains(call)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Platform for SimulatedPlatform {
    fn installed_packages(&self) -> Result<Vec<InstalledPackage>, PlatformError> {
        let mut inner = self.lock();
        inner.calls.push(PlatformCall::InstalledPackages);
        if inner.fail_queries {
            return Err(PlatformError::Unavailable("package manager".into()));
        }
        Ok(inner.installed.clone())
    }

    fn is_granted(&self, permission: &Permission) -> Result<bool, PlatformError> {
        let mut inner = self.lock();
        inner.calls.push(PlatformCall::IsGranted(permission.clone()));
        if inner.fail_queries {
            return Err(PlatformError::Unavailable("permission query".into()));
        }
        Ok(inner.granted.contains(permission))
    }

    fn launch_grant(&self, permission: &Permission) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        inner.calls.push(PlatformCall::LaunchGrant(permission.clone()));
        if inner.fail_launch {
            return Err(PlatformError::Rejected(format!("no activity to grant {}", permission)));
        }
        Ok(())
    }

    fn persist_grant(&self, permission: &Permission) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        inner.calls.push(PlatformCall::PersistGrant(permission.clone()));
        if inner.fail_persist {
            return Err(PlatformError::Rejected(format!("cannot persist {}", permission)));
        }
        inner.granted.insert(permission.clone());
        Ok(())
    }

    fn release_grant(&self, permission: &Permission) -> Result<bool, PlatformError> {
        let mut inner = self.lock();
        inner.calls.push(PlatformCall::ReleaseGrant(permission.clone()));
        if inner.refuse_release {
            return Ok(false);
        }
        inner.granted.remove(permission);
        Ok(true)
    }
}
