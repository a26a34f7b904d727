//! Capability traits for resources whose status this crate writes
//!
//! A resource exposes its status substructure and its version token
//! (`metadata.resourceVersion`). The updater is generic over these traits
//! so no dynamic downcast is ever needed.

use std::fmt::Debug;

use kube::{Resource, ResourceExt};

/// A status payload that can absorb another status under a merge policy.
pub trait CopyStatus: Clone + Debug + Default + PartialEq + Send + Sync + 'static {
    /// Field-level merge policy, opaque to the updater
    type Options: Clone + Debug + Default + Send + Sync + 'static;

    /// Overlay `from` onto `self` according to `options`
    fn copy_from(&mut self, from: &Self, options: &Self::Options);
}

/// A Kubernetes resource carrying a status subresource.
///
/// Implementors only provide access to the status field. Identity and the
/// version token come from the object metadata.
pub trait StatusResource: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static {
    /// The status substructure of this resource
    type Status: CopyStatus;

    /// Current status, if any has been reported
    fn status(&self) -> Option<&Self::Status>;

    /// Mutable access to the status slot
    fn status_mut(&mut self) -> &mut Option<Self::Status>;

    /// Status, inserting a default value if none is set yet
    fn ensure_status(&mut self) -> &mut Self::Status {
        self.status_mut().get_or_insert_with(Default::default)
    }

    /// The opaque version token issued by the store
    fn version_token(&self) -> Option<&str> {
        self.meta().resource_version.as_deref()
    }

    /// Replace the version token
    fn set_version_token(&mut self, token: Option<String>) {
        self.meta_mut().resource_version = token;
    }

    /// (namespace, name) identity; cluster-scoped resources use an empty namespace
    fn namespace_name(&self) -> (String, String) {
        (self.namespace().unwrap_or_default(), self.name_any())
    }
}

/// Per-call options for a status update
#[derive(Clone, Debug, Default)]
pub struct UpdateStatusOptions<O> {
    /// Treat a missing resource as success instead of an error
    pub tolerate_absence: bool,
    /// Merge policy passed to [`CopyStatus::copy_from`]
    pub copy_status_options: O,
}

impl<O> UpdateStatusOptions<O> {
    /// Options with the given merge policy and absence not tolerated
    pub fn new(copy_status_options: O) -> Self {
        Self {
            tolerate_absence: false,
            copy_status_options,
        }
    }

    /// Tolerate the resource being absent
    pub fn tolerate_absence(mut self, tolerate: bool) -> Self {
        self.tolerate_absence = tolerate;
        self
    }
}
