//! Registry error types.

use thiserror::Error;

/// Errors that can occur while registering or looking up states
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The state implements neither the enter nor the exit capability
    #[error("State '{id}' implements neither enter nor exit; it cannot be registered")]
    Configuration { id: String },

    /// The resolver has no binding for the identity, or it was never registered
    #[error("Unknown state '{id}'")]
    UnknownState { id: String },

    /// A registered record lost both capabilities
    #[error("State '{id}' has no enter or exit hook")]
    InvalidStateIdentity { id: String },
}
