//! Resource store abstraction
//!
//! [`ResourceStore`] is the seam between the status updater and the control
//! plane. [`KubeStore`] talks to the Kubernetes API; [`MemoryStore`] keeps
//! objects in process and enforces the same optimistic-concurrency rules,
//! which makes it suitable for controller tests.

mod kubernetes;
mod memory;

pub use kubernetes::{KubeStore, DEFAULT_FIELD_MANAGER};
pub use memory::{MemoryStore, StoreFault};

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::resource::StatusResource;
use crate::Result;

/// Trait abstracting the fetch and status-write operations of a store
///
/// This trait allows mocking the store in tests while using the real
/// Kubernetes client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore<R: StatusResource>: Send + Sync {
    /// Fetch the current copy of a resource
    ///
    /// Returns `Ok(None)` when the resource does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<R>>;

    /// Write the status subresource of `resource`
    ///
    /// The write carries the version token of `resource`; the store rejects
    /// it with a conflict if the stored object has moved on. Spec changes in
    /// `resource` are ignored. Returns the object as stored after the write.
    async fn update_status(&self, resource: &R) -> Result<R>;
}

#[async_trait]
impl<R, S> ResourceStore<R> for std::sync::Arc<S>
where
    R: StatusResource,
    S: ResourceStore<R> + ?Sized,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<R>> {
        (**self).get(namespace, name).await
    }

    async fn update_status(&self, resource: &R) -> Result<R> {
        (**self).update_status(resource).await
    }
}
