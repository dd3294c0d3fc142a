//! Per-transition options.

use serde::{Deserialize, Serialize};

/// How the outgoing exit hook is sequenced against the incoming enter hook.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitOrdering {
    /// Wait for the outgoing state to finish exiting before entering the
    /// new one. Needed when both states drive the same shared resource.
    #[default]
    ExitFirst,

    /// Start entering the new state immediately while the old one is still
    /// exiting. The transition completes once both hooks have finished.
    Overlapped,
}

impl ExitOrdering {
    /// Ordering from the `exit_awaited_first` flag used by callers that
    /// think in terms of a boolean.
    pub fn from_exit_awaited_first(exit_awaited_first: bool) -> Self {
        if exit_awaited_first {
            Self::ExitFirst
        } else {
            Self::Overlapped
        }
    }

    pub fn exit_awaited_first(self) -> bool {
        matches!(self, Self::ExitFirst)
    }
}

/// Options for a single `enter_state` call.
///
/// ```rust
/// use flowstate::core::{ExitOrdering, TransitionOptions};
///
/// let options = TransitionOptions::new().overlapped().force();
/// assert_eq!(options.ordering, ExitOrdering::Overlapped);
/// assert!(options.ignore_if_current);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOptions {
    pub ordering: ExitOrdering,

    /// Re-run the hooks even when the target is already current.
    pub ignore_if_current: bool,
}

impl TransitionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ordering(mut self, ordering: ExitOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn overlapped(self) -> Self {
        self.ordering(ExitOrdering::Overlapped)
    }

    pub fn force(mut self) -> Self {
        self.ignore_if_current = true;
        self
    }
}
