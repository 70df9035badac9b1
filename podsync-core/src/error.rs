//! Error types for podsync-core.

use thiserror::Error;

/// All errors that can arise from spec registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A spec with this key is already registered.
    #[error("spec key already registered: {key}")]
    DuplicateKey { key: String },

    /// No spec is registered under this key.
    #[error("no spec registered under key: {key}")]
    UnknownKey { key: String },

    /// The spec exists but has no service for this container id.
    #[error("spec {key} has no service for container {container_id}")]
    UnknownService { key: String, container_id: String },
}
