//! Enter/exit capabilities of a state.
//!
//! A state exposes zero, one or two asynchronous hooks. The capabilities are
//! resolved once, when the state is wrapped in a [`StateHandle`], so the
//! machine never has to ask a state object what it can do.

use async_trait::async_trait;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error returned by a state's enter or exit hook.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, keeping it reachable through `source()`.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A state that runs asynchronous work when it becomes current.
#[async_trait]
pub trait Enterable: Send + Sync {
    async fn on_enter(&self) -> Result<(), HookError>;
}

/// A state that runs asynchronous work when it stops being current.
#[async_trait]
pub trait Exitable: Send + Sync {
    async fn on_exit(&self) -> Result<(), HookError>;
}

/// Capability record for one registered state.
///
/// Cloning a handle is cheap and shares the underlying state instance, so
/// a state obtained from a resolver behaves as a singleton.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use flowstate::core::{Enterable, Exitable, HookError, StateHandle};
/// use std::sync::Arc;
///
/// struct Settings;
///
/// #[async_trait]
/// impl Enterable for Settings {
///     async fn on_enter(&self) -> Result<(), HookError> {
///         Ok(())
///     }
/// }
///
/// #[async_trait]
/// impl Exitable for Settings {
///     async fn on_exit(&self) -> Result<(), HookError> {
///         Ok(())
///     }
/// }
///
/// let handle = StateHandle::full(Arc::new(Settings));
/// assert!(handle.can_enter());
/// assert!(handle.can_exit());
/// assert!(StateHandle::new().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct StateHandle {
    enter: Option<Arc<dyn Enterable>>,
    exit: Option<Arc<dyn Exitable>>,
}

impl StateHandle {
    /// A handle with no capabilities. Registries reject it unless a hook is
    /// attached with [`with_enter`](Self::with_enter) or
    /// [`with_exit`](Self::with_exit).
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for a state that can only be entered.
    pub fn enterable<T: Enterable + 'static>(state: Arc<T>) -> Self {
        Self::new().with_enter(state)
    }

    /// Handle for a state that can only be exited.
    pub fn exitable<T: Exitable + 'static>(state: Arc<T>) -> Self {
        Self::new().with_exit(state)
    }

    /// Handle for a state with both hooks, sharing one instance.
    pub fn full<T: Enterable + Exitable + 'static>(state: Arc<T>) -> Self {
        Self::new().with_enter(state.clone()).with_exit(state)
    }

    pub fn with_enter(mut self, hook: Arc<dyn Enterable>) -> Self {
        self.enter = Some(hook);
        self
    }

    pub fn with_exit(mut self, hook: Arc<dyn Exitable>) -> Self {
        self.exit = Some(hook);
        self
    }

    pub fn can_enter(&self) -> bool {
        self.enter.is_some()
    }

    pub fn can_exit(&self) -> bool {
        self.exit.is_some()
    }

    /// True when the handle exposes neither hook.
    pub fn is_empty(&self) -> bool {
        !self.can_enter() && !self.can_exit()
    }

    pub(crate) fn enter_hook(&self) -> Option<Arc<dyn Enterable>> {
        self.enter.clone()
    }

    pub(crate) fn exit_hook(&self) -> Option<Arc<dyn Exitable>> {
        self.exit.clone()
    }
}

impl fmt::Debug for StateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHandle")
            .field("can_enter", &self.can_enter())
            .field("can_exit", &self.can_exit())
            .finish()
    }
}
