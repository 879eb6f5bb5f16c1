//! # Service abstraction.
//!
//! The only contract the orchestrator consumes from an application service: a
//! stable name and one async initialization function.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::InitError;

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;

/// # Asynchronous service initialization.
///
/// `initialize` is called once per attempt. The token is cancelled when the
/// attempt times out or the orchestrator shuts down; implementations should
/// check it around long waits.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use bootvisor::{InitError, Service};
///
/// struct Database;
///
/// #[async_trait]
/// impl Service for Database {
///     fn name(&self) -> &str { "db" }
///
///     async fn initialize(&self, ctx: CancellationToken) -> Result<(), InitError> {
///         if ctx.is_cancelled() {
///             return Err(InitError::Canceled);
///         }
///         // open the pool...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Returns a stable, human-readable name.
    fn name(&self) -> &str;

    /// Runs one initialization attempt.
    async fn initialize(&self, ctx: CancellationToken) -> Result<(), InitError>;
}
