//! Status update with retry
//!
//! [`StatusUpdater::apply`] persists the status of a resource without touching
//! its spec. Each attempt fetches the latest server copy, overlays the desired
//! status onto it, writes the status subresource, then re-reads the object to
//! carry the server's version token back into the caller's copy.
//!
//! Concurrent writers are expected. The store rejects writes made against a
//! stale token, and the next attempt starts again from a fresh fetch.
//!
//! Cancellation is cooperative: it is checked before the loop, at the start
//! of every attempt and while waiting between attempts. A cancelled update is
//! reported as success ([`StatusOutcome::Cancelled`]) since an abandoned task
//! has nothing meaningful to report.

use std::marker::PhantomData;

use kube::{Client, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::RetryConfig;
use crate::resource::{CopyStatus, StatusResource, UpdateStatusOptions};
use crate::store::{KubeStore, ResourceStore};
use crate::{Error, Result};

/// Options type accepted by [`StatusUpdater`] for resource `R`
pub type OptionsFor<R> = UpdateStatusOptions<<<R as StatusResource>::Status as CopyStatus>::Options>;

/// How a successful status update ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusOutcome {
    /// The status was written and the caller's token moved to the server's
    Updated {
        /// Token held by the caller before the update
        from: Option<String>,
        /// Token observed on the server after the write
        to: Option<String>,
    },
    /// The status was written but the server token equals the caller's.
    ///
    /// Either the write was a no-op or the store masked the change.
    Unchanged,
    /// The resource does not exist and absence was tolerated
    AbsentTolerated,
    /// Cancellation was observed before the update completed
    Cancelled,
}

impl StatusOutcome {
    /// Returns true if the caller's version token was changed
    pub fn token_changed(&self) -> bool {
        matches!(self, StatusOutcome::Updated { .. })
    }
}

/// Writes resource status through a [`ResourceStore`] with bounded retries
pub struct StatusUpdater<R, S> {
    store: S,
    config: RetryConfig,
    _resource: PhantomData<fn() -> R>,
}

impl<R: StatusResource> StatusUpdater<R, KubeStore<R>> {
    /// Create an updater that writes through the Kubernetes API
    pub fn for_client(client: Client, config: RetryConfig) -> Self {
        Self {
            store: KubeStore::new(client),
            config,
            _resource: PhantomData,
        }
    }
}

impl<R, S> StatusUpdater<R, S>
where
    R: StatusResource,
    S: ResourceStore<R>,
{
    /// Create an updater over the given store and retry policy
    pub fn new(store: S, config: RetryConfig) -> Self {
        Self {
            store,
            config,
            _resource: PhantomData,
        }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The retry policy in effect
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Fetch the current server copy of a resource
    pub async fn get(&self, namespace: &str, name: &str) -> Result<Option<R>> {
        self.store.get(namespace, name).await
    }

    /// Persist the status of `resource`, retrying on failure.
    ///
    /// Performs at most `max_attempts` attempts spaced by the configured
    /// interval. On success `resource`'s version token matches the server's.
    /// Once the budget is spent the last error is returned.
    #[instrument(
        skip_all,
        fields(namespace = %resource.namespace().unwrap_or_default(), name = %resource.name_any())
    )]
    pub async fn apply(
        &self,
        cancel: &CancellationToken,
        resource: &mut R,
        options: &OptionsFor<R>,
    ) -> Result<StatusOutcome> {
        if cancel.is_cancelled() {
            debug!("task is done, skipping status update");
            return Ok(StatusOutcome::Cancelled);
        }

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let err = match self.attempt_once(cancel, resource, options).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => e,
            };

            if attempt >= max_attempts {
                error!(
                    attempt = attempt,
                    error = %err,
                    "status update failed, all retries are exhausted"
                );
                return Err(err);
            }

            if !self.config.retry_terminal && !err.is_retryable() {
                error!(
                    attempt = attempt,
                    error = %err,
                    "status update failed with non-retryable error"
                );
                return Err(err);
            }

            warn!(
                attempt = attempt,
                max_attempts = max_attempts,
                error = %err,
                delay_ms = self.config.interval.as_millis() as u64,
                "status update failed, will retry"
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(attempt = attempt, "task is done while waiting to retry");
                    return Ok(StatusOutcome::Cancelled);
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }

    /// Run a single fetch-merge-write-reread cycle.
    ///
    /// Only the status of the fetched copy is changed before writing, so the
    /// write carries the latest known spec. The caller's token is updated
    /// only after the write succeeded and the re-read observed the result.
    #[instrument(level = "debug", skip_all)]
    async fn attempt_once(
        &self,
        cancel: &CancellationToken,
        resource: &mut R,
        options: &OptionsFor<R>,
    ) -> Result<StatusOutcome> {
        if cancel.is_cancelled() {
            debug!("task is done, abandoning attempt");
            return Ok(StatusOutcome::Cancelled);
        }

        let (namespace, name) = resource.namespace_name();
        debug!("updating status");

        let Some(mut current) = self.fetch(&namespace, &name, options).await? else {
            return Ok(StatusOutcome::AbsentTolerated);
        };

        let merged = current.ensure_status();
        if let Some(desired) = resource.status() {
            merged.copy_from(desired, &options.copy_status_options);
        }

        if let Err(e) = self.store.update_status(&current).await {
            debug!(error = %e, "got error upon status update, may retry");
            return Err(e);
        }

        // The write landed, so a read failure here is never taken for absence
        let latest = match self.store.get(&namespace, &name).await {
            Ok(Some(latest)) => latest,
            Ok(None) if options.tolerate_absence => {
                debug!("resource deleted after status update, absence tolerated");
                return Ok(StatusOutcome::AbsentTolerated);
            }
            Ok(None) => {
                error!("resource deleted after status update");
                return Err(Error::absent(namespace, name));
            }
            Err(e) => {
                debug!(error = %e, "failed to re-read resource after status update, may retry");
                return Err(e);
            }
        };

        let from = resource.version_token().map(str::to_owned);
        let to = latest.version_token().map(str::to_owned);

        if from == to {
            debug!(
                resource_version = ?from,
                "resourceVersion unchanged after status update"
            );
            return Ok(StatusOutcome::Unchanged);
        }

        info!(from = ?from, to = ?to, "resourceVersion change");
        resource.set_version_token(to.clone());
        Ok(StatusOutcome::Updated { from, to })
    }

    /// Fetch applying the absence policy.
    ///
    /// `Ok(None)` means the object is gone (or unreadable) and absence is tolerated.
    async fn fetch(
        &self,
        namespace: &str,
        name: &str,
        options: &OptionsFor<R>,
    ) -> Result<Option<R>> {
        match self.store.get(namespace, name).await {
            Ok(Some(resource)) => Ok(Some(resource)),
            Ok(None) if options.tolerate_absence => {
                debug!("resource not found, absence tolerated");
                Ok(None)
            }
            Ok(None) => {
                error!("resource not found");
                Err(Error::absent(namespace, name))
            }
            Err(e) if options.tolerate_absence => {
                debug!(error = %e, "failed to fetch resource, absence tolerated");
                Ok(None)
            }
            Err(e) => {
                error!(error = %e, "failed to fetch resource");
                Err(e)
            }
        }
    }
}
