//! Integration tests for status writes through the API server
//!
//! These tests tell the story of a controller reporting status for a
//! ManagedInstallation while users keep editing it.

use std::time::Duration;

use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use tokio_util::sync::CancellationToken;

use cr_status::crd::{
    ManagedInstallation, ManagedInstallationSpec, ManagedStatus, Phase, StatusCopyOptions,
};
use cr_status::{
    KubeStore, ResourceStore, RetryConfig, StatusOutcome, StatusResource, StatusUpdater,
    UpdateStatusOptions,
};

use super::helpers::{cleanup_installation, ensure_test_cluster, TEST_NAMESPACE};

// =============================================================================
// Test Fixtures
// =============================================================================

fn sample_installation(name: &str) -> ManagedInstallation {
    let mut mi = ManagedInstallation::new(
        name,
        ManagedInstallationSpec {
            replicas: 2,
            version: Some("24.3".to_string()),
            suspended: false,
        },
    );
    mi.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    mi
}

fn updater(client: &Client) -> StatusUpdater<ManagedInstallation, KubeStore<ManagedInstallation>> {
    StatusUpdater::for_client(
        client.clone(),
        RetryConfig::with_max_attempts(5).interval(Duration::from_millis(200)),
    )
}

async fn create(client: &Client, name: &str) -> ManagedInstallation {
    cleanup_installation(client, name).await;
    let api: Api<ManagedInstallation> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    api.create(&PostParams::default(), &sample_installation(name))
        .await
        .expect("failed to create installation")
}

// =============================================================================
// Status Write Stories
// =============================================================================

/// Story: the controller reports Completed for a fresh installation
///
/// Expected behavior:
/// - The status subresource is written
/// - The controller's copy ends up with the server's resourceVersion
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_controller_reports_status() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let name = "status-report";
    let mut local = create(&client, name).await;
    local.status = Some(ManagedStatus::with_phase(Phase::Completed).message("ready"));

    let outcome = updater(&client)
        .apply(
            &CancellationToken::new(),
            &mut local,
            &UpdateStatusOptions::new(StatusCopyOptions::whole()),
        )
        .await
        .expect("status update should succeed");

    assert!(outcome.token_changed());
    let api: Api<ManagedInstallation> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let server = api.get(name).await.expect("failed to get installation");
    assert_eq!(
        server.status.as_ref().map(|s| s.phase.clone()),
        Some(Phase::Completed)
    );
    assert_eq!(local.version_token(), server.version_token());

    cleanup_installation(&client, name).await;
}

/// Story: a user scales the installation after the controller read it
///
/// Expected behavior:
/// - A direct write with the stale resourceVersion is rejected as a conflict
/// - The updater refetches and writes status without undoing the scale
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_stale_write_conflicts_and_updater_recovers() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let name = "status-conflict";
    let mut local = create(&client, name).await;
    local.status = Some(ManagedStatus::with_phase(Phase::InProgress));

    let api: Api<ManagedInstallation> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    api.patch(
        name,
        &PatchParams::default(),
        &Patch::Merge(&serde_json::json!({ "spec": { "replicas": 5 } })),
    )
    .await
    .expect("failed to scale installation");

    let store = KubeStore::<ManagedInstallation>::new(client.clone());
    let err = store
        .update_status(&local)
        .await
        .expect_err("stale write must be rejected");
    assert!(err.is_conflict());

    let outcome = updater(&client)
        .apply(
            &CancellationToken::new(),
            &mut local,
            &UpdateStatusOptions::new(StatusCopyOptions::whole()),
        )
        .await
        .expect("status update should succeed");
    assert!(outcome.token_changed());

    let server = api.get(name).await.expect("failed to get installation");
    assert_eq!(server.spec.replicas, 5);
    assert_eq!(
        server.status.as_ref().map(|s| s.phase.clone()),
        Some(Phase::InProgress)
    );

    cleanup_installation(&client, name).await;
}

/// Story: the installation was deleted before the controller reported
///
/// Expected behavior:
/// - With absence tolerated, the update succeeds without writing
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_deleted_installation_is_tolerated() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let name = "status-deleted";
    cleanup_installation(&client, name).await;

    let mut local = sample_installation(name);
    local.status = Some(ManagedStatus::with_phase(Phase::Failed));

    let outcome = updater(&client)
        .apply(
            &CancellationToken::new(),
            &mut local,
            &UpdateStatusOptions::new(StatusCopyOptions::whole()).tolerate_absence(true),
        )
        .await
        .expect("absence should be tolerated");

    assert_eq!(outcome, StatusOutcome::AbsentTolerated);
}
