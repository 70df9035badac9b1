//! podsync core library — spec data model, shared registry, errors.
//!
//! Public API surface:
//! - [`types`] — the Spec/Service/RemoteContainer hierarchy and statuses
//! - [`registry`] — [`SpecRegistry`], the one synchronization point
//! - [`error`] — [`RegistryError`]

pub mod error;
pub mod registry;
pub mod types;

pub use error::RegistryError;
pub use registry::SpecRegistry;
pub use types::{
    Endpoint, RemoteContainer, Service, ServiceList, Spec, SpecDetails, SpecList, Status,
    STATUS_ERROR, STATUS_INIT, STATUS_STARTING, STATUS_STOPPED, STATUS_SYNCING,
};
