//! Core state machine types.
//!
//! This module contains the building blocks shared by the registry and the
//! machine:
//! - State identities via the `StateId` trait
//! - Enter/exit capabilities and the `StateHandle` record
//! - Per-transition options and the ordering policy
//! - Bounded transition history

mod capability;
mod history;
mod id;
mod options;

pub use capability::{Enterable, Exitable, HookError, StateHandle};
pub use history::{TransitionHistory, TransitionRecord};
pub use id::{Identified, StateId, TypeKey};
pub use options::{ExitOrdering, TransitionOptions};
