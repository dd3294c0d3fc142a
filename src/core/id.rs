//! State identities.
//!
//! An identity is the key a machine uses to look up a registered state and
//! the argument callers pass when asking for a transition. Any cheap,
//! comparable, hashable value works: a plain enum, an interned string, or a
//! [`TypeKey`] derived from a Rust type.

use std::any::TypeId;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};

/// Trait for state identities.
///
/// Identities must stay stable for the lifetime of the machine that uses
/// them. `name` is only used for diagnostics and log output.
///
/// # Example
///
/// ```rust
/// use flowstate::core::StateId;
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
/// enum Screen {
///     Boot,
///     MainMenu,
/// }
///
/// impl StateId for Screen {
///     fn name(&self) -> &str {
///         match self {
///             Self::Boot => "Boot",
///             Self::MainMenu => "MainMenu",
///         }
///     }
/// }
///
/// assert_eq!(Screen::MainMenu.name(), "MainMenu");
/// ```
pub trait StateId: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Human readable name for logging.
    fn name(&self) -> &str;
}

impl StateId for &'static str {
    fn name(&self) -> &str {
        self
    }
}

impl StateId for String {
    fn name(&self) -> &str {
        self.as_str()
    }
}

/// Maps a Rust type onto the identity space of a machine.
///
/// This is what backs the typed `enter::<T>()` overloads on
/// [`AsyncStateMachine`](crate::machine::AsyncStateMachine).
pub trait Identified<I: StateId> {
    /// Identity of this type within `I`.
    fn state_id() -> I;
}

/// Identity derived from a Rust type.
///
/// Two keys are equal when they were built from the same type. The type
/// name is carried along for diagnostics only.
#[derive(Clone, Copy, Debug)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeKey {
    /// Key for `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl StateId for TypeKey {
    // Last path segment, e.g. `MenuState` for `game::states::MenuState`.
    fn name(&self) -> &str {
        let base = self.type_name.split('<').next().unwrap_or(self.type_name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl<T: 'static> Identified<TypeKey> for T {
    fn state_id() -> TypeKey {
        TypeKey::of::<T>()
    }
}
