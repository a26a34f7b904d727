//! cr-status - conflict-safe status writes for Kubernetes custom resources
//!
//! A controller that reports status for a resource it does not own exclusively
//! must write only the status subresource, without clobbering concurrent spec
//! edits, and converge its in-memory copy with the server's resourceVersion.
//!
//! # Protocol
//!
//! Each attempt runs fetch-latest → merge-status → write-back → reconcile-version:
//! - fetch the current object by namespace/name
//! - overlay the caller's desired status onto the fetched copy
//! - write the status subresource carrying the fetched resourceVersion
//! - re-read the object and copy the new resourceVersion into the caller's copy
//!
//! Attempts are wrapped in a bounded, fixed-interval retry loop that honours
//! cooperative cancellation.
//!
//! # Modules
//!
//! - [`updater`] - [`StatusUpdater`] retry loop and single attempt
//! - [`store`] - Store seam with Kubernetes and in-memory implementations
//! - [`resource`] - Capability traits implemented by status-bearing resources
//! - [`crd`] - Reusable status payload and the ManagedInstallation CRD
//! - [`config`] - Retry policy and environment overrides
//! - [`telemetry`] - Tracing subscriber setup for binaries
//! - [`error`] - Error types

#![deny(missing_docs)]

use std::time::Duration;

pub mod config;
pub mod crd;
pub mod error;
pub mod resource;
pub mod store;
pub mod telemetry;
pub mod updater;

pub use config::RetryConfig;
pub use error::Error;
pub use resource::{CopyStatus, StatusResource, UpdateStatusOptions};
pub use store::{KubeStore, MemoryStore, ResourceStore};
pub use updater::{StatusOutcome, StatusUpdater};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default number of attempts before a status update gives up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Default delay between status update attempts
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);
