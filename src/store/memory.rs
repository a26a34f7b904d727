//! In-process store with optimistic concurrency
//!
//! Every successful write assigns a fresh version token. A status write whose
//! token does not match the stored object fails with [`Error::Conflict`],
//! mirroring how the API server treats a stale `resourceVersion`. A status
//! write that changes nothing leaves the token as it was.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::trace;

use super::ResourceStore;
use crate::resource::StatusResource;
use crate::{Error, Result};

type Key = (String, String);
type ConcurrentWrite<R> = Box<dyn FnOnce(&mut R) + Send>;

/// Failure injected into store calls
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreFault {
    /// Transient backend failure (connection reset, 5xx)
    Unavailable,
    /// Optimistic-concurrency rejection
    Conflict,
}

#[derive(Clone, Copy, Debug)]
struct FaultPlan {
    fault: StoreFault,
    /// Remaining injections; `None` injects forever
    remaining: Option<u32>,
}

impl FaultPlan {
    fn take(slot: &mut Option<FaultPlan>) -> Option<StoreFault> {
        let plan = (*slot)?;
        match plan.remaining {
            None => Some(plan.fault),
            Some(0) => {
                *slot = None;
                None
            }
            Some(n) => {
                *slot = (n > 1).then_some(FaultPlan {
                    remaining: Some(n - 1),
                    ..plan
                });
                Some(plan.fault)
            }
        }
    }
}

struct Inner<R> {
    objects: HashMap<Key, R>,
    next_version: u64,
    get_calls: u32,
    update_calls: u32,
    get_fault: Option<FaultPlan>,
    update_fault: Option<FaultPlan>,
    concurrent_writes: Vec<ConcurrentWrite<R>>,
}

impl<R: StatusResource> Inner<R> {
    fn bump(&mut self, resource: &mut R) {
        self.next_version += 1;
        resource.set_version_token(Some(self.next_version.to_string()));
    }

    fn fault_error(fault: StoreFault, op: &str, namespace: &str, name: &str) -> Error {
        match fault {
            StoreFault::Unavailable => {
                Error::store_with_context(op, format!("{}/{}: store unavailable", namespace, name))
            }
            StoreFault::Conflict => Error::conflict(namespace, name, "injected conflict"),
        }
    }
}

/// Thread-safe in-memory [`ResourceStore`]
pub struct MemoryStore<R> {
    inner: Mutex<Inner<R>>,
}

impl<R: StatusResource> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: StatusResource> MemoryStore<R> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                objects: HashMap::new(),
                next_version: 0,
                get_calls: 0,
                update_calls: 0,
                get_fault: None,
                update_fault: None,
                concurrent_writes: Vec::new(),
            }),
        }
    }

    /// Create or replace an object, assigning it a fresh version token.
    ///
    /// Returns the stored copy.
    pub fn insert(&self, mut resource: R) -> R {
        let mut inner = self.inner.lock();
        inner.bump(&mut resource);
        let key = resource.namespace_name();
        inner.objects.insert(key, resource.clone());
        resource
    }

    /// Modify a stored object as another writer would, bumping its token.
    ///
    /// Returns the stored copy, or `None` if the object does not exist.
    pub fn mutate(&self, namespace: &str, name: &str, f: impl FnOnce(&mut R)) -> Option<R> {
        let mut inner = self.inner.lock();
        let key = (namespace.to_string(), name.to_string());
        let mut resource = inner.objects.remove(&key)?;
        f(&mut resource);
        inner.bump(&mut resource);
        inner.objects.insert(key, resource.clone());
        Some(resource)
    }

    /// Delete an object
    pub fn remove(&self, namespace: &str, name: &str) -> Option<R> {
        self.inner
            .lock()
            .objects
            .remove(&(namespace.to_string(), name.to_string()))
    }

    /// Read an object without counting it as a store call
    pub fn snapshot(&self, namespace: &str, name: &str) -> Option<R> {
        self.inner
            .lock()
            .objects
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Number of `get` calls served, including failed ones
    pub fn get_calls(&self) -> u32 {
        self.inner.lock().get_calls
    }

    /// Number of `update_status` calls served, including failed ones
    pub fn update_calls(&self) -> u32 {
        self.inner.lock().update_calls
    }

    /// Fail the next `times` gets (`None` fails every get)
    pub fn fail_gets(&self, fault: StoreFault, times: Option<u32>) {
        self.inner.lock().get_fault = Some(FaultPlan {
            fault,
            remaining: times,
        });
    }

    /// Fail the next `times` status writes (`None` fails every write)
    pub fn fail_updates(&self, fault: StoreFault, times: Option<u32>) {
        self.inner.lock().update_fault = Some(FaultPlan {
            fault,
            remaining: times,
        });
    }

    /// Run `f` as a concurrent writer right before the next status write is
    /// applied, i.e. after the updater fetched but before it wrote.
    ///
    /// The interleaved write bumps the token, so the pending status write
    /// sees a conflict. Queued writers run one per status write.
    pub fn interleave_write(&self, f: impl FnOnce(&mut R) + Send + 'static) {
        self.inner.lock().concurrent_writes.push(Box::new(f));
    }
}

#[async_trait]
impl<R: StatusResource> ResourceStore<R> for MemoryStore<R> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<R>> {
        let mut inner = self.inner.lock();
        inner.get_calls += 1;

        if let Some(fault) = FaultPlan::take(&mut inner.get_fault) {
            return Err(Inner::<R>::fault_error(fault, "get", namespace, name));
        }

        Ok(inner
            .objects
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn update_status(&self, resource: &R) -> Result<R> {
        let (namespace, name) = resource.namespace_name();
        let mut inner = self.inner.lock();
        inner.update_calls += 1;

        if let Some(fault) = FaultPlan::take(&mut inner.update_fault) {
            return Err(Inner::<R>::fault_error(
                fault,
                "update_status",
                &namespace,
                &name,
            ));
        }

        let key = (namespace.clone(), name.clone());

        if !inner.concurrent_writes.is_empty() {
            let write = inner.concurrent_writes.remove(0);
            if let Some(mut stored) = inner.objects.remove(&key) {
                write(&mut stored);
                inner.bump(&mut stored);
                inner.objects.insert(key.clone(), stored);
            }
        }

        let Some(mut stored) = inner.objects.remove(&key) else {
            return Err(Error::absent(namespace, name));
        };

        if stored.version_token() != resource.version_token() {
            let message = format!(
                "resourceVersion {:?} is stale, current is {:?}",
                resource.version_token(),
                stored.version_token()
            );
            inner.objects.insert(key, stored);
            return Err(Error::conflict(namespace, name, message));
        }

        // Unchanged status is a no-op and keeps the token, as on the API server
        if stored.status() != resource.status() {
            *stored.status_mut() = resource.status().cloned();
            inner.bump(&mut stored);
        }
        trace!(
            namespace = %namespace,
            name = %name,
            version = ?stored.version_token(),
            "status written"
        );
        inner.objects.insert(key, stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ManagedInstallation, ManagedInstallationSpec, ManagedStatus, Phase};

    fn installation(ns: &str, name: &str) -> ManagedInstallation {
        let mut mi = ManagedInstallation::new(
            name,
            ManagedInstallationSpec {
                replicas: 1,
                ..Default::default()
            },
        );
        mi.metadata.namespace = Some(ns.to_string());
        mi
    }

    #[tokio::test]
    async fn test_insert_assigns_tokens_and_get_counts() {
        let store = MemoryStore::new();
        let first = store.insert(installation("ns", "a"));
        let second = store.insert(installation("ns", "b"));
        assert_ne!(first.version_token(), second.version_token());

        let fetched = store.get("ns", "a").await.unwrap().unwrap();
        assert_eq!(fetched.version_token(), first.version_token());
        assert!(store.get("ns", "missing").await.unwrap().is_none());
        assert_eq!(store.get_calls(), 2);
    }

    #[tokio::test]
    async fn test_status_write_keeps_stored_spec() {
        let store = MemoryStore::new();
        let mut local = store.insert(installation("ns", "a"));
        local.spec.replicas = 99;
        local.status = Some(ManagedStatus::with_phase(Phase::Completed));

        let written = store.update_status(&local).await.unwrap();
        assert_eq!(written.spec.replicas, 1);
        assert_eq!(written.status.as_ref().map(|s| s.phase.clone()), Some(Phase::Completed));
        assert_ne!(written.version_token(), local.version_token());
    }

    #[tokio::test]
    async fn test_identical_status_write_keeps_token() {
        let store = MemoryStore::new();
        let mut local = store.insert(installation("ns", "a"));
        local.status = Some(ManagedStatus::with_phase(Phase::Completed));
        let written = store.update_status(&local).await.unwrap();

        let again = store.update_status(&written).await.unwrap();
        assert_eq!(again.version_token(), written.version_token());
        assert_eq!(store.update_calls(), 2);
    }

    #[tokio::test]
    async fn test_stale_token_conflicts() {
        let store = MemoryStore::new();
        let local = store.insert(installation("ns", "a"));
        store.mutate("ns", "a", |mi| mi.spec.replicas = 5).unwrap();

        let err = store.update_status(&local).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.snapshot("ns", "a").unwrap().spec.replicas, 5);
    }

    #[tokio::test]
    async fn test_update_of_missing_object_is_absent() {
        let store = MemoryStore::new();
        let local = store.insert(installation("ns", "a"));
        store.remove("ns", "a");

        let err = store.update_status(&local).await.unwrap_err();
        assert!(err.is_absent());
    }

    #[tokio::test]
    async fn test_interleaved_write_causes_conflict_once() {
        let store = MemoryStore::new();
        let local = store.insert(installation("ns", "a"));
        store.interleave_write(|mi| mi.spec.version = Some("2.0".to_string()));

        assert!(store.update_status(&local).await.unwrap_err().is_conflict());

        let fresh = store.get("ns", "a").await.unwrap().unwrap();
        assert_eq!(fresh.spec.version.as_deref(), Some("2.0"));
        assert!(store.update_status(&fresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_fault_injection_is_bounded() {
        let store = MemoryStore::new();
        store.insert(installation("ns", "a"));
        store.fail_gets(StoreFault::Unavailable, Some(2));

        assert!(store.get("ns", "a").await.is_err());
        assert!(store.get("ns", "a").await.is_err());
        assert!(store.get("ns", "a").await.unwrap().is_some());
        assert_eq!(store.get_calls(), 3);

        store.fail_updates(StoreFault::Conflict, None);
        let local = store.snapshot("ns", "a").unwrap();
        for _ in 0..3 {
            assert!(store.update_status(&local).await.unwrap_err().is_conflict());
        }
        assert_eq!(store.update_calls(), 3);
    }
}
