//! Resolvers that produce state instances from identities.

use crate::core::{StateHandle, StateId};
use std::collections::HashMap;

/// Produces the singleton state for an identity.
///
/// Registries call `resolve` once per identity while a machine is being
/// initialized. Returning `None` means the resolver has no binding.
pub trait StateResolver<I: StateId> {
    fn resolve(&mut self, id: &I) -> Option<StateHandle>;
}

impl<I, F> StateResolver<I> for F
where
    I: StateId,
    F: FnMut(&I) -> Option<StateHandle>,
{
    fn resolve(&mut self, id: &I) -> Option<StateHandle> {
        self(id)
    }
}

type Supplier = Box<dyn FnMut() -> StateHandle + Send>;

/// Explicit identity → supplier map.
///
/// Each supplier runs at most once; the handle it returns is cached and
/// handed out again on later lookups, so every identity maps to a single
/// state instance.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use flowstate::core::{Enterable, HookError, StateHandle};
/// use flowstate::registry::{StateFactory, StateResolver};
/// use std::sync::Arc;
///
/// struct Boot;
///
/// #[async_trait]
/// impl Enterable for Boot {
///     async fn on_enter(&self) -> Result<(), HookError> {
///         Ok(())
///     }
/// }
///
/// let mut factory = StateFactory::new().bind("Boot", || StateHandle::enterable(Arc::new(Boot)));
///
/// assert!(factory.resolve(&"Boot").is_some());
/// assert!(factory.resolve(&"Shop").is_none());
/// ```
pub struct StateFactory<I: StateId> {
    suppliers: HashMap<I, Supplier>,
    instances: HashMap<I, StateHandle>,
}

impl<I: StateId> StateFactory<I> {
    pub fn new() -> Self {
        Self {
            suppliers: HashMap::new(),
            instances: HashMap::new(),
        }
    }

    /// Bind an identity to a lazily invoked supplier. Rebinding replaces
    /// both the supplier and any instance it already produced.
    pub fn bind<F>(mut self, id: I, supplier: F) -> Self
    where
        F: FnMut() -> StateHandle + Send + 'static,
    {
        self.instances.remove(&id);
        self.suppliers.insert(id, Box::new(supplier));
        self
    }

    /// Bind an identity to an existing instance.
    pub fn bind_instance(mut self, id: I, handle: StateHandle) -> Self {
        self.suppliers.remove(&id);
        self.instances.insert(id, handle);
        self
    }

    pub fn is_bound(&self, id: &I) -> bool {
        self.suppliers.contains_key(id) || self.instances.contains_key(id)
    }

    /// Identities this factory can resolve, in no particular order.
    pub fn identities(&self) -> Vec<I> {
        self.suppliers
            .keys()
            .chain(self.instances.keys())
            .cloned()
            .collect()
    }
}

impl<I: StateId> Default for StateFactory<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: StateId> StateResolver<I> for StateFactory<I> {
    fn resolve(&mut self, id: &I) -> Option<StateHandle> {
        if let Some(handle) = self.instances.get(id) {
            return Some(handle.clone());
        }

        let mut supplier = self.suppliers.remove(id)?;
        let handle = supplier();
        tracing::trace!(state = id.name(), "created state instance");
        self.instances.insert(id.clone(), handle.clone());
        Some(handle)
    }
}
