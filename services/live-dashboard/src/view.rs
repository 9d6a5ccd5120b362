//! Bounded, deduplicated, observation-ordered view of measurements
//!
//! Two inputs feed the view: one bulk snapshot and an unbounded sequence of
//! change events. A snapshot replaces the view wholesale. A change removes
//! any row with the same id, lands at position 0 and the view is truncated to
//! its capacity. Ordering is by observation, never by the row timestamp.

use std::collections::HashSet;

use serde::Serialize;

use crate::measurement::Measurement;

/// Maximum number of rows kept in the view
pub const VIEW_CAPACITY: usize = 200;

/// The local view driving the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LocalView {
    rows: Vec<Measurement>,
    #[serde(skip)]
    capacity: usize,
}

impl Default for LocalView {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalView {
    pub fn new() -> Self {
        Self::with_capacity(VIEW_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Replace the view with a snapshot, already ordered by timestamp descending.
    ///
    /// This is an assignment, not a merge: rows inserted by earlier change
    /// events are discarded.
    pub fn apply_snapshot(&mut self, rows: Vec<Measurement>) {
        let mut seen = HashSet::with_capacity(rows.len());
        self.rows = rows
            .into_iter()
            .filter(|row| seen.insert(row.id))
            .take(self.capacity)
            .collect();
    }

    /// Merge one post-change row image into the view.
    ///
    /// Inserts and updates take the same path, so an update to an old row
    /// surfaces it at the top.
    pub fn apply_change(&mut self, incoming: Measurement) {
        self.rows.retain(|row| row.id != incoming.id);
        self.rows.insert(0, incoming);
        self.rows.truncate(self.capacity);
    }

    /// The most recently observed row
    pub fn latest(&self) -> Option<&Measurement> {
        self.rows.first()
    }

    pub fn rows(&self) -> &[Measurement] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ids(&self) -> Vec<i64> {
        self.rows.iter().map(|row| row.id).collect()
    }
}
