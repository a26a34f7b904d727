//! Retry policy for status updates
//!
//! The policy is an explicit value handed to [`StatusUpdater`](crate::StatusUpdater)
//! so tests can shrink the budget and interval. Production deployments can
//! override the defaults through environment variables via [`RetryConfig::from_env`].

use std::time::Duration;

use crate::{Error, Result, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_INTERVAL};

/// Environment variable overriding [`RetryConfig::max_attempts`]
pub const ENV_MAX_ATTEMPTS: &str = "CR_STATUS_MAX_ATTEMPTS";

/// Environment variable overriding [`RetryConfig::interval`] (milliseconds)
pub const ENV_RETRY_INTERVAL_MS: &str = "CR_STATUS_RETRY_INTERVAL_MS";

/// Environment variable overriding [`RetryConfig::retry_terminal`]
pub const ENV_RETRY_TERMINAL: &str = "CR_STATUS_RETRY_TERMINAL";

/// Trait for reading configuration from the environment
///
/// Abstracts environment variable access so config parsing can be tested
/// without touching process-global state.
#[cfg_attr(test, mockall::automock)]
pub trait EnvConfig: Send + Sync {
    /// Get the raw value of an environment variable
    fn var(&self, key: &str) -> Option<String>;
}

/// Default implementation that reads from process environment variables
#[derive(Clone, Debug, Default)]
pub struct OsEnvConfig;

impl EnvConfig for OsEnvConfig {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Retry policy for the status update loop.
///
/// Attempts are spaced by a fixed interval; there is no exponential backoff.
/// Total wall time is bounded by roughly `max_attempts * interval`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of fetch-merge-write cycles (must be at least 1)
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub interval: Duration,
    /// Keep retrying errors classified as non-retryable (e.g. an absent
    /// resource when absence is not tolerated). When false, such errors end
    /// the loop on first occurrence.
    pub retry_terminal: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_RETRY_INTERVAL,
            retry_terminal: true,
        }
    }
}

impl RetryConfig {
    /// Create a config with a maximum number of attempts
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts.max(1),
            ..Default::default()
        }
    }

    /// Set the delay between attempts
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Stop on the first non-retryable error instead of spending the budget
    pub fn fail_fast(mut self) -> Self {
        self.retry_terminal = false;
        self
    }

    /// Build a config from defaults overlaid with environment overrides
    pub fn from_env(env: &dyn EnvConfig) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = env.var(ENV_MAX_ATTEMPTS) {
            let attempts: u32 = raw
                .trim()
                .parse()
                .map_err(|e| Error::config(ENV_MAX_ATTEMPTS, format!("{raw:?}: {e}")))?;
            if attempts == 0 {
                return Err(Error::config(ENV_MAX_ATTEMPTS, "must be at least 1"));
            }
            config.max_attempts = attempts;
        }

        if let Some(raw) = env.var(ENV_RETRY_INTERVAL_MS) {
            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|e| Error::config(ENV_RETRY_INTERVAL_MS, format!("{raw:?}: {e}")))?;
            config.interval = Duration::from_millis(millis);
        }

        if let Some(raw) = env.var(ENV_RETRY_TERMINAL) {
            config.retry_terminal = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(Error::config(
                        ENV_RETRY_TERMINAL,
                        format!("{raw:?} is not a boolean"),
                    ))
                }
            };
        }

        Ok(config)
    }
}
