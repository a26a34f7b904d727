//! Store backed by the Kubernetes API

use std::marker::PhantomData;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, PostParams};
use kube::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::ResourceStore;
use crate::resource::StatusResource;
use crate::{Error, Result};

/// Field manager recorded on status writes unless overridden
pub const DEFAULT_FIELD_MANAGER: &str = "cr-status";

/// Real Kubernetes store implementation for namespaced resources
pub struct KubeStore<R> {
    client: Client,
    field_manager: String,
    _resource: PhantomData<fn() -> R>,
}

impl<R> KubeStore<R> {
    /// Create a new KubeStore wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self::with_field_manager(client, DEFAULT_FIELD_MANAGER)
    }

    /// Create a KubeStore recording writes under the given field manager
    pub fn with_field_manager(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
            _resource: PhantomData,
        }
    }

    /// Field manager used for status writes
    pub fn field_manager(&self) -> &str {
        &self.field_manager
    }
}

/// Map API errors onto the status-update taxonomy
fn classify(err: kube::Error, namespace: &str, name: &str) -> Error {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => Error::absent(namespace, name),
        kube::Error::Api(ae) if ae.code == 409 => Error::conflict(namespace, name, ae.message),
        other => Error::from(other),
    }
}

#[async_trait]
impl<R> ResourceStore<R> for KubeStore<R>
where
    R: StatusResource<Scope = NamespaceResourceScope> + Serialize + DeserializeOwned,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<R>> {
        let api: Api<R> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| classify(e, namespace, name))
    }

    async fn update_status(&self, resource: &R) -> Result<R> {
        let (namespace, name) = resource.namespace_name();
        let token = resource.version_token().ok_or_else(|| {
            Error::store_with_context(
                "update_status",
                format!("{}/{} has no resourceVersion", namespace, name),
            )
        })?;

        // The whole status is replaced, so fields cleared locally are cleared on the server.
        // The resourceVersion in the body makes the API server reject stale writes with 409.
        let body = serde_json::to_vec(resource).map_err(|e| {
            Error::store_with_context(
                "update_status",
                format!("failed to serialize {}/{}: {}", namespace, name, e),
            )
        })?;

        debug!(
            namespace = %namespace,
            name = %name,
            resource_version = %token,
            "replacing status subresource"
        );

        let params = PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        };
        let api: Api<R> = Api::namespaced(self.client.clone(), &namespace);
        api.replace_status(&name, &params, body)
            .await
            .map_err(|e| classify(e, &namespace, &name))
    }
}
