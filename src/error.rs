//! Error types for status updates
//!
//! Errors carry the namespace/name of the resource involved so a failed
//! attempt can be traced back to the object it was writing.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for status update operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The resource does not exist in the store
    #[error("resource {namespace}/{name} not found")]
    Absent {
        /// Namespace of the missing resource (empty for cluster-scoped)
        namespace: String,
        /// Name of the missing resource
        name: String,
    },

    /// The write was rejected because the version token was stale
    #[error("conflict writing {namespace}/{name}: {message}")]
    Conflict {
        /// Namespace of the resource
        namespace: String,
        /// Name of the resource
        name: String,
        /// Description of the conflict
        message: String,
    },

    /// Store-level failure not covered by the other variants
    #[error("store error [{context}]: {message}")]
    Store {
        /// Description of what failed
        message: String,
        /// Operation where the error occurred (e.g., "get", "update_status")
        context: String,
    },

    /// Invalid configuration value
    #[error("invalid configuration {key}: {message}")]
    Config {
        /// Configuration key that failed to parse
        key: String,
        /// Description of what's invalid
        message: String,
    },
}

impl Error {
    /// Create an absence error for the given resource
    pub fn absent(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Absent {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a version conflict error for the given resource
    pub fn conflict(
        namespace: impl Into<String>,
        name: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            namespace: namespace.into(),
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a store error with the given message
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create a store error with operation context
    pub fn store_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Create a configuration error for the given key
    pub fn config(key: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            message: msg.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Absence and configuration errors are deterministic and not retryable.
    /// Conflicts are always retryable: a fresh fetch picks up the new token.
    /// Kubernetes errors are retryable unless they are a 4xx other than
    /// 409 (conflict) or 429 (throttling).
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => match source {
                kube::Error::Api(ae) => {
                    !(400..500).contains(&ae.code) || ae.code == 409 || ae.code == 429
                }
                _ => true,
            },
            Error::Absent { .. } => false,
            Error::Conflict { .. } => true,
            Error::Store { .. } => true,
            Error::Config { .. } => false,
        }
    }

    /// Check if this error means the resource does not exist
    pub fn is_absent(&self) -> bool {
        match self {
            Error::Absent { .. } => true,
            Error::Kube {
                source: kube::Error::Api(ae),
            } => ae.code == 404,
            _ => false,
        }
    }

    /// Check if this error is an optimistic-concurrency conflict
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Conflict { .. } => true,
            Error::Kube {
                source: kube::Error::Api(ae),
            } => ae.code == 409,
            _ => false,
        }
    }

    /// Get the (namespace, name) of the resource if this error names one
    pub fn resource(&self) -> Option<(&str, &str)> {
        match self {
            Error::Absent { namespace, name } | Error::Conflict { namespace, name, .. } => {
                Some((namespace, name))
            }
            _ => None,
        }
    }
}
