//! Shared setup for cluster-backed tests

use std::time::Duration;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

use cr_status::crd::ManagedInstallation;

/// Namespace used by all cluster-backed tests
pub const TEST_NAMESPACE: &str = "default";

/// Connect to the cluster and make sure the CRD is installed and established
pub async fn ensure_test_cluster() -> Result<Client, kube::Error> {
    let client = Client::try_default().await?;

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let crd = ManagedInstallation::crd();
    let name = crd.metadata.name.clone().unwrap_or_default();
    crds.patch(
        &name,
        &PatchParams::apply("cr-status-tests").force(),
        &Patch::Apply(&crd),
    )
    .await?;

    for _ in 0..30 {
        let current = crds.get(&name).await?;
        let established = current
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .map(|conds| {
                conds
                    .iter()
                    .any(|c| c.type_ == "Established" && c.status == "True")
            })
            .unwrap_or(false);
        if established {
            break;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    Ok(client)
}

/// Delete a test installation, ignoring errors
pub async fn cleanup_installation(client: &Client, name: &str) {
    let api: Api<ManagedInstallation> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let _ = api.delete(name, &DeleteParams::default()).await;
}
