//! Transition history tracking.
//!
//! A machine records every committed transition so callers can inspect how
//! navigation got to where it is. The log is bounded; the oldest records
//! are dropped once the limit is reached.

use super::id::StateId;
use super::options::ExitOrdering;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single committed transition.
///
/// # Example
///
/// ```rust
/// use flowstate::core::{ExitOrdering, TransitionRecord};
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     from: Some("Boot"),
///     to: "MainMenu",
///     ordering: ExitOrdering::ExitFirst,
///     forced: false,
///     timestamp: Utc::now(),
/// };
/// assert_eq!(record.to, "MainMenu");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "I: Serialize", deserialize = "I: Deserialize<'de>"))]
pub struct TransitionRecord<I> {
    /// State that was current before the transition, if any
    pub from: Option<I>,
    /// State that became current
    pub to: I,
    /// Ordering policy used for the hooks
    pub ordering: ExitOrdering,
    /// Whether the transition re-entered the already current state
    pub forced: bool,
    /// When the transition was committed
    pub timestamp: DateTime<Utc>,
}

/// Ordered, bounded history of committed transitions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "I: Serialize", deserialize = "I: Deserialize<'de>"))]
pub struct TransitionHistory<I> {
    records: VecDeque<TransitionRecord<I>>,
    limit: Option<usize>,
}

impl<I> Default for TransitionHistory<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> TransitionHistory<I> {
    /// Unbounded history.
    pub fn new() -> Self {
        Self {
            records: VecDeque::new(),
            limit: None,
        }
    }

    /// History keeping at most `limit` records. A limit of zero disables
    /// recording entirely.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(limit.min(64)),
            limit: Some(limit),
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Append a record, evicting the oldest ones past the limit.
    pub fn record(&mut self, record: TransitionRecord<I>) {
        if self.limit == Some(0) {
            return;
        }
        self.records.push_back(record);
        if let Some(limit) = self.limit {
            while self.records.len() > limit {
                self.records.pop_front();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&TransitionRecord<I>> {
        self.records.back()
    }

    /// Records in commit order, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &TransitionRecord<I>> {
        self.records.iter()
    }

    /// Path of states traversed: the origin of the oldest record (when
    /// there was one), then the target of each record.
    pub fn get_path(&self) -> Vec<&I> {
        let mut path = Vec::new();
        if let Some(from) = self.records.front().and_then(|r| r.from.as_ref()) {
            path.push(from);
        }
        for record in &self.records {
            path.push(&record.to);
        }
        path
    }

    /// Time between the oldest and newest record.
    pub fn duration(&self) -> Option<Duration> {
        let first = self.records.front()?;
        let last = self.records.back()?;
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }
}

impl<I: StateId> TransitionHistory<I> {
    /// Number of times `id` became current.
    pub fn visits(&self, id: &I) -> usize {
        self.records.iter().filter(|r| &r.to == id).count()
    }
}
