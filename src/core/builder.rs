use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    core::Config,
    events::Bus,
    services::{ServiceSpec, ServiceTable},
    subscribers::{Subscribe, SubscriberSet},
};

use super::orchestrator::Orchestrator;

/// Builder for constructing an [`Orchestrator`].
pub struct OrchestratorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    services: Vec<ServiceSpec>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            services: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (transitions, retries, failures)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the service table. Declaration order is sweep order.
    pub fn with_services(mut self, services: Vec<ServiceSpec>) -> Self {
        self.services = services;
        self
    }

    /// Appends one service to the table.
    pub fn service(mut self, spec: ServiceSpec) -> Self {
        self.services.push(spec);
        self
    }

    /// Builds the orchestrator.
    ///
    /// The table is validated by [`Orchestrator::run`], not here. Must be called
    /// inside a Tokio runtime when subscribers are configured.
    pub fn build(self) -> Arc<Orchestrator> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));

        Arc::new(Orchestrator::new_internal(
            self.cfg,
            bus,
            subs,
            ServiceTable::new(self.services),
            CancellationToken::new(),
        ))
    }
}
