//! ManagedInstallation Custom Resource Definition
//!
//! A namespaced resource whose spec is owned by users and whose status is
//! reported by a controller through [`StatusUpdater`](crate::StatusUpdater).

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::status::ManagedStatus;
use crate::resource::StatusResource;

/// Specification for a ManagedInstallation
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "status.example.dev",
    version = "v1",
    kind = "ManagedInstallation",
    plural = "managedinstallations",
    shortname = "mi",
    status = "ManagedStatus",
    namespaced,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedInstallationSpec {
    /// Number of replicas requested
    pub replicas: u32,

    /// Software version to install
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Pause reconciliation of this installation
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub suspended: bool,
}

impl StatusResource for ManagedInstallation {
    type Status = ManagedStatus;

    fn status(&self) -> Option<&ManagedStatus> {
        self.status.as_ref()
    }

    fn status_mut(&mut self) -> &mut Option<ManagedStatus> {
        &mut self.status
    }
}
