//! # Service spec: descriptor plus implementation.
//!
//! [`ServiceSpec`] bundles what the orchestrator needs to run one service: its
//! static [`ServiceDescriptor`], the [`ServiceRef`] to initialize, and an optional
//! [`RetryPolicy`] override.
//!
//! A spec can be created:
//! - **Explicitly** with [`ServiceSpec::new`]
//! - **Fluently** with [`ServiceSpec::builder`](crate::ServiceSpec::builder)

use crate::{
    core::Config,
    policies::RetryPolicy,
    services::{descriptor::ServiceDescriptor, service::ServiceRef},
};

/// Descriptor + service + retry override.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use bootvisor::{InitError, ServiceDescriptor, ServiceFn, ServiceRef, ServiceSpec};
///
/// let db: ServiceRef = ServiceFn::arc("db", |_ctx: CancellationToken| async move {
///     Ok::<(), InitError>(())
/// });
/// let spec = ServiceSpec::new(ServiceDescriptor::new("db").critical(true), db);
/// assert_eq!(spec.id(), "db");
/// assert!(spec.retry().is_none());
/// ```
#[derive(Clone)]
pub struct ServiceSpec {
    descriptor: ServiceDescriptor,
    service: ServiceRef,
    retry: Option<RetryPolicy>,
}

impl ServiceSpec {
    /// Creates a spec that inherits the orchestrator's default retry policy.
    pub fn new(descriptor: ServiceDescriptor, service: ServiceRef) -> Self {
        Self {
            descriptor,
            service,
            retry: None,
        }
    }

    /// Returns the service id.
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Returns the static descriptor.
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// Returns the service handle.
    pub fn service(&self) -> &ServiceRef {
        &self.service
    }

    /// Returns the retry override, if any.
    pub fn retry(&self) -> Option<RetryPolicy> {
        self.retry
    }

    /// Returns a new spec with a retry override.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Effective retry policy: the override (or `cfg.retry`) with the descriptor's
    /// timeout taking precedence over the policy's own attempt timeout.
    pub fn effective_retry(&self, cfg: &Config) -> RetryPolicy {
        let base = self.retry.unwrap_or(cfg.retry);
        match self.descriptor.attempt_timeout() {
            Some(timeout) => base.with_attempt_timeout(Some(timeout)),
            None => base.with_attempt_timeout(base.timeout().or(cfg.default_timeout())),
        }
    }
}

impl std::fmt::Debug for ServiceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSpec")
            .field("descriptor", &self.descriptor)
            .field("service", &self.service.name())
            .field("retry", &self.retry)
            .finish()
    }
}
