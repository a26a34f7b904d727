//! Custom Resource Definitions and status payloads
//!
//! [`ManagedStatus`] is a reusable status body with a field-grouped copy
//! policy. [`ManagedInstallation`] is a namespaced custom resource that
//! carries it, used by controllers built on this crate and by the tests.

mod installation;
mod status;
mod types;

pub use installation::{ManagedInstallation, ManagedInstallationSpec};
pub use status::{ManagedStatus, StatusCopyOptions, MAX_STATUS_LIST_LEN};
pub use types::{Condition, ConditionStatus, Phase};
