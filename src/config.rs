//! Machine configuration.

use crate::core::{ExitOrdering, TransitionOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of transitions kept in a machine's history.
pub const DEFAULT_HISTORY_LIMIT: usize = 32;

/// Errors that can occur when loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid machine configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings for one machine instance.
///
/// Every field has a default, so a partial document is enough:
///
/// ```rust
/// use flowstate::config::MachineConfig;
/// use flowstate::core::ExitOrdering;
///
/// let config = MachineConfig::from_json(r#"{ "name": "ui", "default_ordering": "overlapped" }"#).unwrap();
/// assert_eq!(config.name, "ui");
/// assert_eq!(config.default_ordering, ExitOrdering::Overlapped);
/// assert_eq!(config.history_limit, 32);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Name used in log output to tell machine instances apart
    pub name: String,

    /// Ordering used by `enter_state` calls without explicit options
    pub default_ordering: ExitOrdering,

    /// Maximum number of transitions kept in history
    pub history_limit: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            name: "state-machine".to_string(),
            default_ordering: ExitOrdering::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl MachineConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn default_ordering(mut self, ordering: ExitOrdering) -> Self {
        self.default_ordering = ordering;
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Options applied by calls that don't pass their own.
    pub fn default_options(&self) -> TransitionOptions {
        TransitionOptions::new().ordering(self.default_ordering)
    }
}
