//! # Service abstractions and the service metadata table.
//!
//! This module provides the service-related types:
//! - [`ServiceDescriptor`] - static declaration (id, description, dependencies, critical path, timeout)
//! - [`Service`] - trait for implementing async initialization
//! - [`ServiceFn`] - closure-based service implementation
//! - [`ServiceRef`] - shared reference to a service (`Arc<dyn Service>`)
//! - [`ServiceSpec`] - descriptor + service + optional retry override
//! - [`ServiceTable`] - validated, ordered collection of specs

mod descriptor;
mod service;
mod service_fn;
mod spec;
mod spec_builder;
mod table;

pub use descriptor::ServiceDescriptor;
pub use service::{Service, ServiceRef};
pub use service_fn::ServiceFn;
pub use spec::ServiceSpec;
pub use spec_builder::ServiceSpecBuilder;
pub use table::ServiceTable;
