//! # Bootstrap event subscribers
//!
//! A [`Subscribe`] implementation sees every [`Event`] the store and the retry
//! loop publish: transitions (`ServiceInitializing`, `ServiceReady`,
//! `ServiceFailed`, ...), attempt progress and the aggregate `SystemReady` /
//! `CriticalFailure` flips. Typical uses are alerting on failed services,
//! exporting boot timings or mirroring progress into a UI.
//!
//! Events reach a subscriber through its own worker and bounded queue inside the
//! [`SubscriberSet`](crate::SubscriberSet). A slow subscriber never delays a
//! store commit; when its queue is full the event is dropped for that
//! subscriber only and a `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use std::sync::Mutex;
//! use async_trait::async_trait;
//! use bootvisor::{Event, EventKind, Subscribe};
//!
//! /// Collects ids of services that failed terminally.
//! #[derive(Default)]
//! struct FailedServices(Mutex<Vec<String>>);
//!
//! #[async_trait]
//! impl Subscribe for FailedServices {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind != EventKind::ServiceFailed {
//!             return;
//!         }
//!         if let (Some(id), Ok(mut ids)) = (event.service.as_deref(), self.0.lock()) {
//!             ids.push(id.to_string());
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "failed-services"
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let sub = FailedServices::default();
//! sub.on_event(&Event::new(EventKind::ServiceReady).with_service("db")).await;
//! sub.on_event(
//!     &Event::new(EventKind::ServiceFailed)
//!         .with_service("cache")
//!         .with_critical(false),
//! )
//! .await;
//! assert_eq!(*sub.0.lock().unwrap(), vec!["cache".to_string()]);
//! # }
//! ```

use crate::events::Event;
use async_trait::async_trait;

/// Receives bootstrap events on a dedicated worker.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Called once per event, in publish order.
    async fn on_event(&self, event: &Event);

    /// Name used in `SubscriberOverflow` / `SubscriberPanicked` events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered for this subscriber before new ones are dropped.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
