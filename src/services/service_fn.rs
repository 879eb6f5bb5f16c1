//! # Closure-backed service (`ServiceFn`)
//!
//! [`ServiceFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a
//! fresh future per attempt. State shared between attempts must be put behind an
//! explicit `Arc` inside the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use bootvisor::{InitError, ServiceFn, ServiceRef};
//!
//! let cache: ServiceRef = ServiceFn::arc("cache", |_ctx: CancellationToken| async move {
//!     Ok::<_, InitError>(())
//! });
//! assert_eq!(cache.name(), "cache");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::InitError;
use crate::services::service::Service;

/// Closure-backed service implementation.
pub struct ServiceFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ServiceFn<F> {
    /// Creates a new closure-backed service.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the service and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Service for ServiceFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), InitError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self, ctx: CancellationToken) -> Result<(), InitError> {
        (self.f)(ctx).await
    }
}
