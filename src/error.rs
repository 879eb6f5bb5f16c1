//! Error types used by the bootvisor runtime and services.
//!
//! This module defines three error enums:
//!
//! - [`ConfigError`]: the service table is malformed (fatal, raised before anything starts).
//! - [`InitError`]: raised by a single service initialization (per attempt or terminal).
//! - [`BootError`]: raised by orchestrator entry points.
//!
//! All of them provide helper methods (`as_label`, `as_message`) for logging/metrics;
//! [`InitError::is_retryable`] drives the retry loop.

use std::time::Duration;
use thiserror::Error;

/// # Errors in the declared service table.
///
/// Detected by [`ServiceTable::validate`](crate::ServiceTable::validate) before any
/// service is started. There is no partial-start fallback.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two descriptors share the same id.
    #[error("service '{id}' is declared more than once")]
    DuplicateService {
        /// The duplicated id.
        id: String,
    },

    /// A service lists itself as a dependency.
    #[error("service '{id}' depends on itself")]
    SelfDependency {
        /// The offending service.
        id: String,
    },

    /// A service depends on an id that is not in the table.
    #[error("service '{service}' depends on unknown service '{dependency}'")]
    UnknownDependency {
        /// The declaring service.
        service: String,
        /// The missing dependency id.
        dependency: String,
    },

    /// The dependency graph contains a cycle.
    #[error("circular dependency detected: {}", .path.join(" -> "))]
    Cycle {
        /// Participating ids; the first id is repeated at the end.
        path: Vec<String>,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use bootvisor::ConfigError;
    ///
    /// let err = ConfigError::Cycle { path: vec!["a".into(), "b".into(), "a".into()] };
    /// assert_eq!(err.as_label(), "config_cycle");
    /// assert_eq!(err.to_string(), "circular dependency detected: a -> b -> a");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::DuplicateService { .. } => "config_duplicate_service",
            ConfigError::SelfDependency { .. } => "config_self_dependency",
            ConfigError::UnknownDependency { .. } => "config_unknown_dependency",
            ConfigError::Cycle { .. } => "config_cycle",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ConfigError::DuplicateService { id } => format!("duplicate service id={id}"),
            ConfigError::SelfDependency { id } => format!("self dependency id={id}"),
            ConfigError::UnknownDependency {
                service,
                dependency,
            } => format!("unknown dependency service={service} dependency={dependency}"),
            ConfigError::Cycle { path } => format!("cycle path={}", path.join("->")),
        }
    }
}

/// # Errors produced by service initialization.
///
/// `Timeout` and `Application` are retryable and stay inside the retry loop;
/// `MaxRetriesExceeded` and `Fatal` are terminal for the service.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// The attempt did not settle before the per-attempt timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The service's own init function failed; may succeed if retried.
    #[error("initialization failed: {message}")]
    Application {
        /// The underlying error message.
        message: String,
    },

    /// Non-recoverable error; the retry loop stops immediately.
    #[error("fatal error (no retry): {message}")]
    Fatal {
        /// The underlying error message.
        message: String,
    },

    /// Every allowed attempt failed.
    #[error("'{key}' failed after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        /// Retry key (the service id for orchestrated services).
        key: String,
        /// Number of attempts made.
        attempts: u32,
        /// Error of the final attempt.
        last_error: Box<InitError>,
    },

    /// The runtime was shut down while the initialization was in flight.
    #[error("initialization cancelled")]
    Canceled,
}

impl InitError {
    /// Builds an [`InitError::Application`] from any displayable error.
    pub fn application(err: impl std::fmt::Display) -> Self {
        InitError::Application {
            message: err.to_string(),
        }
    }

    /// Builds an [`InitError::Fatal`] from any displayable error.
    pub fn fatal(err: impl std::fmt::Display) -> Self {
        InitError::Fatal {
            message: err.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use bootvisor::InitError;
    /// use std::time::Duration;
    ///
    /// let err = InitError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "init_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            InitError::Timeout { .. } => "init_timeout",
            InitError::Application { .. } => "init_failed",
            InitError::Fatal { .. } => "init_fatal",
            InitError::MaxRetriesExceeded { .. } => "init_max_retries_exceeded",
            InitError::Canceled => "init_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            InitError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            InitError::Application { message } => format!("error: {message}"),
            InitError::Fatal { message } => format!("fatal: {message}"),
            InitError::MaxRetriesExceeded {
                key,
                attempts,
                last_error,
            } => format!(
                "exhausted: key={key} attempts={attempts} last={}",
                last_error.as_message()
            ),
            InitError::Canceled => "cancelled".to_string(),
        }
    }

    /// Indicates whether the error type is safe to retry.
    ///
    /// Returns `true` for [`InitError::Application`] and [`InitError::Timeout`],
    /// `false` otherwise.
    ///
    /// # Example
    /// ```
    /// use bootvisor::InitError;
    ///
    /// assert!(InitError::application("boom").is_retryable());
    /// assert!(!InitError::fatal("nope").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, InitError::Application { .. } | InitError::Timeout { .. })
    }

    /// True for the distinguished "attempts exhausted" error.
    pub fn is_max_retries(&self) -> bool {
        matches!(self, InitError::MaxRetriesExceeded { .. })
    }

    /// Returns the error of the last attempt, unwrapping `MaxRetriesExceeded`.
    pub fn root_cause(&self) -> &InitError {
        match self {
            InitError::MaxRetriesExceeded { last_error, .. } => last_error.root_cause(),
            other => other,
        }
    }
}

/// # Errors returned by orchestrator entry points.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootError {
    /// The service table failed validation; nothing was started.
    #[error("invalid service table: {0}")]
    Configuration(#[from] ConfigError),

    /// The referenced id is not registered.
    #[error("unknown service '{id}'")]
    UnknownService {
        /// The requested id.
        id: String,
    },

    /// The service reached `Failed`.
    #[error("service '{id}' failed: {source}")]
    ServiceFailed {
        /// The failed service.
        id: String,
        /// Terminal error recorded for it.
        #[source]
        source: InitError,
    },

    /// The service cannot start because an upstream dependency failed.
    #[error("service '{id}' is blocked by failed dependencies: {}", .failed.join(", "))]
    BlockedByFailure {
        /// The blocked service.
        id: String,
        /// Failed (or failure-blocked) dependencies.
        failed: Vec<String>,
    },

    /// A critical-path service failed; the application cannot proceed.
    #[error("critical service '{id}' failed: {source}")]
    CriticalFailure {
        /// The critical service.
        id: String,
        /// Terminal error recorded for it.
        #[source]
        source: InitError,
    },

    /// The orchestrator was shut down.
    #[error("orchestrator shut down")]
    Canceled,
}

impl BootError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BootError::Configuration(_) => "boot_configuration",
            BootError::UnknownService { .. } => "boot_unknown_service",
            BootError::ServiceFailed { .. } => "boot_service_failed",
            BootError::BlockedByFailure { .. } => "boot_blocked_by_failure",
            BootError::CriticalFailure { .. } => "boot_critical_failure",
            BootError::Canceled => "boot_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BootError::Configuration(e) => e.as_message(),
            BootError::UnknownService { id } => format!("unknown service id={id}"),
            BootError::ServiceFailed { id, source } => {
                format!("service failed id={id} {}", source.as_message())
            }
            BootError::BlockedByFailure { id, failed } => {
                format!("blocked id={id} failed={failed:?}")
            }
            BootError::CriticalFailure { id, source } => {
                format!("critical failure id={id} {}", source.as_message())
            }
            BootError::Canceled => "cancelled".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_unwraps_exhaustion() {
        let err = InitError::MaxRetriesExceeded {
            key: "db".into(),
            attempts: 3,
            last_error: Box::new(InitError::Timeout {
                timeout: Duration::from_millis(50),
            }),
        };
        assert!(err.is_max_retries());
        assert!(!err.is_retryable());
        assert_eq!(
            err.root_cause(),
            &InitError::Timeout {
                timeout: Duration::from_millis(50)
            }
        );
    }

    #[test]
    fn config_error_converts_into_boot_error() {
        let boot: BootError = ConfigError::SelfDependency { id: "a".into() }.into();
        assert_eq!(boot.as_label(), "boot_configuration");
        assert_eq!(boot.to_string(), "invalid service table: service 'a' depends on itself");
    }
}
