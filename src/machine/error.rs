//! Machine error types.

use crate::core::HookError;
use crate::registry::RegistryError;
use std::fmt;
use thiserror::Error;

/// Which hook of a transition failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Enter,
    Exit,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => f.write_str("enter"),
            Self::Exit => f.write_str("exit"),
        }
    }
}

/// Errors that can occur while initializing a machine or running a transition
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("State machine '{machine}' used before initialize()")]
    NotInitialized { machine: String },

    #[error("State machine '{machine}' is already initialized")]
    AlreadyInitialized { machine: String },

    /// Initialization rejected one or more states
    #[error("State machine '{machine}' failed to initialize: {}", summarize(.errors))]
    Configuration {
        machine: String,
        errors: Vec<RegistryError>,
    },

    /// The target identity was never registered
    #[error("Unknown state '{id}'")]
    UnknownState { id: String },

    /// The target is registered without enter or exit capability
    #[error("State '{id}' has no enter or exit hook")]
    InvalidStateIdentity { id: String },

    /// A state's hook failed; the transition was still committed
    #[error("The {phase} hook of state '{id}' failed: {source}")]
    HookFailed {
        id: String,
        phase: HookPhase,
        #[source]
        source: HookError,
    },
}

fn summarize(errors: &[RegistryError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl MachineError {
    /// Translate a registry lookup failure at transition time.
    pub(crate) fn from_lookup(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownState { id } => Self::UnknownState { id },
            RegistryError::InvalidStateIdentity { id } | RegistryError::Configuration { id } => {
                Self::InvalidStateIdentity { id }
            }
        }
    }

    pub fn is_hook_failure(&self) -> bool {
        matches!(self, Self::HookFailed { .. })
    }
}
