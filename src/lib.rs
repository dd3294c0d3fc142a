//! Flowstate: a generic asynchronous state machine
//!
//! Flowstate drives navigation-style flows (boot → main menu → gameplay, or
//! a UI screen stack) where every state may run asynchronous work when it is
//! entered or exited. The same machine type is reused for independent flows,
//! each with its own set of states.
//!
//! # Core Concepts
//!
//! - **Identity**: any comparable key implementing `StateId`
//! - **Capabilities**: a state is `Enterable`, `Exitable`, or both
//! - **Registry**: identity → `StateHandle`, filled once at initialization
//! - **Machine**: sequences exit and enter hooks per `ExitOrdering`
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use flowstate::{state_ids, AsyncStateMachine, Enterable, Exitable, HookError, StateHandle};
//! use std::sync::Arc;
//!
//! state_ids! {
//!     enum Flow {
//!         Boot,
//!         MainMenu,
//!     }
//! }
//!
//! struct Screen;
//!
//! #[async_trait]
//! impl Enterable for Screen {
//!     async fn on_enter(&self) -> Result<(), HookError> {
//!         Ok(())
//!     }
//! }
//!
//! #[async_trait]
//! impl Exitable for Screen {
//!     async fn on_exit(&self) -> Result<(), HookError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let machine: AsyncStateMachine<Flow> = AsyncStateMachine::new();
//! machine
//!     .initialize_with(|registry| {
//!         registry.register(Flow::Boot, StateHandle::full(Arc::new(Screen)))?;
//!         registry.register(Flow::MainMenu, StateHandle::full(Arc::new(Screen)))
//!     })
//!     .unwrap();
//!
//! machine.enter_state(Flow::Boot).await.unwrap();
//! machine.enter_state(Flow::MainMenu).await.unwrap();
//! assert_eq!(machine.current_identity(), Some(Flow::MainMenu));
//! # }
//! ```

pub mod config;
pub mod core;
mod macros;
pub mod machine;
pub mod registry;

// Re-export commonly used types
pub use config::MachineConfig;
pub use core::{
    Enterable, ExitOrdering, Exitable, HookError, Identified, StateHandle, StateId,
    TransitionOptions, TypeKey,
};
pub use machine::{AsyncStateMachine, EnterOutcome, MachineError};
pub use registry::{RegistryError, StateFactory, StateRegistry, StateResolver};
