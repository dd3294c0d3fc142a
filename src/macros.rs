//! Macros for declaring state identities.

/// Declare an identity enum and implement [`StateId`](crate::core::StateId)
/// for it.
///
/// An optional `types:` section maps Rust types onto variants, enabling the
/// typed `enter::<T>()` overloads.
///
/// # Example
///
/// ```
/// use flowstate::core::{Identified, StateId};
/// use flowstate::state_ids;
///
/// pub struct MainMenuScreen;
/// pub struct ShopScreen;
///
/// state_ids! {
///     pub enum UiScreen {
///         Boot,
///         MainMenu,
///         Shop,
///     }
///     types: [MainMenuScreen => MainMenu, ShopScreen => Shop]
/// }
///
/// assert_eq!(UiScreen::Shop.name(), "Shop");
/// assert_eq!(<ShopScreen as Identified<UiScreen>>::state_id(), UiScreen::Shop);
/// ```
#[macro_export]
macro_rules! state_ids {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        $(types: [$($ty:ty => $mapped:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::StateId for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }

        $($(
            impl $crate::core::Identified<$name> for $ty {
                fn state_id() -> $name {
                    $name::$mapped
                }
            }
        )*)?
    };
}
