//! State registry: identity → capability record.
//!
//! A registry is filled once, while its machine is initialized, and is
//! read-only afterwards. Every record is validated on the way in so that a
//! state with no enter or exit hook is rejected at startup instead of
//! surfacing as a silent no-op at transition time.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use flowstate::core::{Enterable, HookError, StateHandle};
//! use flowstate::registry::{RegistryError, StateRegistry};
//! use std::sync::Arc;
//!
//! struct Boot;
//!
//! #[async_trait]
//! impl Enterable for Boot {
//!     async fn on_enter(&self) -> Result<(), HookError> {
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = StateRegistry::new();
//! registry.register("Boot", StateHandle::enterable(Arc::new(Boot))).unwrap();
//!
//! let rejected = registry.register("Broken", StateHandle::new());
//! assert!(matches!(rejected, Err(RegistryError::Configuration { .. })));
//! assert!(!registry.contains(&"Broken"));
//! ```

pub mod error;
pub mod factory;

pub use error::RegistryError;
pub use factory::{StateFactory, StateResolver};

use crate::core::{StateHandle, StateId};
use std::collections::HashMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Check that a handle exposes at least one capability.
fn check_shape<I: StateId>(id: &I, handle: &StateHandle) -> Result<(), RegistryError> {
    if handle.is_empty() {
        Err(RegistryError::Configuration {
            id: id.name().to_string(),
        })
    } else {
        Ok(())
    }
}

/// Mapping from identity to the capability record of its singleton state.
#[derive(Debug, Clone)]
pub struct StateRegistry<I: StateId> {
    states: HashMap<I, StateHandle>,
}

impl<I: StateId> StateRegistry<I> {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
        }
    }

    /// Insert or overwrite the record for `id`.
    ///
    /// Fails with [`RegistryError::Configuration`] when the handle has
    /// neither capability; nothing is inserted in that case.
    pub fn register(&mut self, id: I, handle: StateHandle) -> Result<(), RegistryError> {
        check_shape(&id, &handle)?;

        tracing::debug!(
            state = id.name(),
            can_enter = handle.can_enter(),
            can_exit = handle.can_exit(),
            "registered state"
        );
        if self.states.insert(id.clone(), handle).is_some() {
            tracing::debug!(state = id.name(), "replaced existing registration");
        }
        Ok(())
    }

    /// Obtain the instance for `id` from the resolver.
    ///
    /// Pure lookup that never touches a registry's contents, so it takes no
    /// receiver. Call it as `StateRegistry::resolve(&mut resolver, &id)`.
    pub fn resolve<R>(resolver: &mut R, id: &I) -> Result<StateHandle, RegistryError>
    where
        R: StateResolver<I> + ?Sized,
    {
        resolver
            .resolve(id)
            .ok_or_else(|| RegistryError::UnknownState {
                id: id.name().to_string(),
            })
    }

    /// Resolve `id` and register the result.
    pub fn register_resolved<R>(&mut self, resolver: &mut R, id: I) -> Result<(), RegistryError>
    where
        R: StateResolver<I> + ?Sized,
    {
        let handle = Self::resolve(resolver, &id)?;
        self.register(id, handle)
    }

    /// Resolve and register every identity in `ids`.
    ///
    /// All identities are checked before anything is inserted. If any of
    /// them is unbound or has no capability, every problem is reported and
    /// the registry is left untouched.
    pub fn register_all<R, It>(
        &mut self,
        resolver: &mut R,
        ids: It,
    ) -> Validation<(), NonEmptyVec<RegistryError>>
    where
        R: StateResolver<I> + ?Sized,
        It: IntoIterator<Item = I>,
    {
        let mut resolved = Vec::new();
        let mut checks: Vec<Validation<(), NonEmptyVec<RegistryError>>> = Vec::new();

        for id in ids {
            let check = match Self::resolve(resolver, &id)
                .and_then(|handle| check_shape(&id, &handle).map(|()| handle))
            {
                Ok(handle) => {
                    resolved.push((id, handle));
                    Validation::success(())
                }
                Err(err) => Validation::fail(err),
            };
            checks.push(check);
        }

        let outcome = Validation::all_vec(checks).map(|_| ());
        if outcome.is_success() {
            for (id, handle) in resolved {
                self.states.insert(id, handle);
            }
        }
        outcome
    }

    /// Look up `id` and re-check its shape.
    ///
    /// Unknown identities fail with [`RegistryError::UnknownState`]; a
    /// record without capabilities fails with
    /// [`RegistryError::InvalidStateIdentity`]. Both `register` and
    /// `register_all` already reject such records, so the second error
    /// cannot normally occur; the machine still runs this check before every
    /// transition.
    pub fn validate_identity(&self, id: &I) -> Result<&StateHandle, RegistryError> {
        let handle = self.get(id).ok_or_else(|| RegistryError::UnknownState {
            id: id.name().to_string(),
        })?;
        if handle.is_empty() {
            return Err(RegistryError::InvalidStateIdentity {
                id: id.name().to_string(),
            });
        }
        Ok(handle)
    }

    pub fn get(&self, id: &I) -> Option<&StateHandle> {
        self.states.get(id)
    }

    pub fn contains(&self, id: &I) -> bool {
        self.states.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn identities(&self) -> impl Iterator<Item = &I> {
        self.states.keys()
    }
}

impl<I: StateId> Default for StateRegistry<I> {
    fn default() -> Self {
        Self::new()
    }
}
