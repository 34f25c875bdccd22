use std::collections::HashMap;

use reaper_core::arn::ResourceKind;
use reaper_core::error::LifecycleError;

use crate::adapters::credentials::SessionCredentials;

/// Liveness and deletion routines for one resource kind, operating over one
/// credential-scoped client set.
pub trait ServiceLifecycle {
    /// Whether the resource still exists in a lifecycle state worth tracking.
    /// A confirmed-missing resource is `Ok(false)`; transient lookup failures
    /// stay errors so callers can log them instead of dropping the resource.
    fn check_live(&self, resource_id: &str) -> Result<bool, LifecycleError>;

    /// Deletes the resource. Implementations issue the destructive call and
    /// return without waiting for asynchronous teardown to finish.
    fn delete(&self, resource_id: &str) -> Result<(), LifecycleError>;
}

/// Capability registry built for one account-region unit of work and
/// discarded afterwards; entries hold clients scoped to that session.
#[derive(Default)]
pub struct LifecycleRegistry {
    entries: HashMap<ResourceKind, Box<dyn ServiceLifecycle>>,
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ResourceKind, lifecycle: Box<dyn ServiceLifecycle>) {
        self.entries.insert(kind, lifecycle);
    }

    /// Kinds without a registered lifecycle are treated as live, so resources
    /// of unrecognized types stay tracked instead of silently vanishing.
    pub fn check_live(
        &self,
        kind: &ResourceKind,
        resource_id: &str,
    ) -> Result<bool, LifecycleError> {
        match self.entries.get(kind) {
            Some(lifecycle) => lifecycle.check_live(resource_id),
            None => Ok(true),
        }
    }

    /// Kinds without a registered lifecycle refuse deletion.
    pub fn delete(&self, kind: &ResourceKind, resource_id: &str) -> Result<(), LifecycleError> {
        match self.entries.get(kind) {
            Some(lifecycle) => lifecycle.delete(resource_id),
            None => Err(LifecycleError::UnsupportedResourceType(kind.to_string())),
        }
    }
}

/// Builds a [LifecycleRegistry] bound to delegated credentials in one region.
pub trait RegistryProvider {
    fn open_region(&self, credentials: &SessionCredentials, region: &str) -> LifecycleRegistry;
}
