use crate::{
    InitError, RetryPolicy, ServiceDescriptor, ServiceFn, ServiceRef, ServiceSpec,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Builder for [`ServiceSpec`] with fluent API.
///
/// ```rust
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use bootvisor::{InitError, ServiceSpec};
///
/// let spec = ServiceSpec::builder("api")
///     .description("public HTTP API")
///     .depends_on(["db"])
///     .critical()
///     .timeout(Duration::from_secs(5))
///     .build(|_ctx: CancellationToken| async { Ok::<(), InitError>(()) });
///
/// assert_eq!(spec.descriptor().dependencies, vec!["db".to_string()]);
/// ```
#[derive(Clone, Debug)]
pub struct ServiceSpecBuilder {
    descriptor: ServiceDescriptor,
    retry: Option<RetryPolicy>,
}

impl ServiceSpecBuilder {
    /// Creates a new builder for the given service id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            descriptor: ServiceDescriptor::new(id),
            retry: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.descriptor.description = description.into();
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptor = self.descriptor.depends_on(deps);
        self
    }

    /// Marks the service as critical-path.
    pub fn critical(mut self) -> Self {
        self.descriptor.critical_path = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.descriptor.timeout = Some(timeout);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Builds a [`ServiceSpec`] from a closure; the service name is the id.
    pub fn build<F, Fut>(self, f: F) -> ServiceSpec
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), InitError>> + Send + 'static,
    {
        let service: ServiceRef = ServiceFn::arc(self.descriptor.id.clone(), f);
        self.build_from_service(service)
    }

    /// Builds a [`ServiceSpec`] around an existing service handle.
    pub fn build_from_service(self, service: ServiceRef) -> ServiceSpec {
        let spec = ServiceSpec::new(self.descriptor, service);
        match self.retry {
            Some(retry) => spec.with_retry(retry),
            None => spec,
        }
    }
}

impl ServiceSpec {
    /// Creates a builder for constructing a [`ServiceSpec`] with fluent API.
    pub fn builder(id: impl Into<String>) -> ServiceSpecBuilder {
        ServiceSpecBuilder::new(id)
    }
}
