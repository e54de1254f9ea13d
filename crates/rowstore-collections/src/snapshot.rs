//! Snapshot iteration with removal pushed back to the live store.
//!
//! Ordered enumeration over a relational table is served from a sorted
//! point-in-time copy: one query up front, then every step is in memory.
//! Removing through the iterator deletes from the live table first and only
//! then drops the element from the copy, so a failed delete leaves both the
//! snapshot and the iterator position exactly as they were.

use std::collections::VecDeque;

use rowstore_core::{StoreError, StoreResult};

/// Deletes the live-store counterpart of a snapshot element.
pub trait LiveRemover<T> {
    fn remove_live(&mut self, item: &T) -> StoreResult<()>;
}

impl<T, F> LiveRemover<T> for F
where
    F: FnMut(&T) -> StoreResult<()>,
{
    fn remove_live(&mut self, item: &T) -> StoreResult<()> {
        self(item)
    }
}

/// Iterator over a cached collection whose `remove` reaches the live store.
pub struct SnapshotIter<T, R> {
    /// Elements already returned by `next`, the last one being removable
    visited: Vec<T>,
    /// Elements not yet returned
    pending: VecDeque<T>,
    /// Whether the last visited element may still be removed
    removable: bool,
    remover: R,
}

impl<T: Clone, R: LiveRemover<T>> SnapshotIter<T, R> {
    pub fn new(snapshot: Vec<T>, remover: R) -> Self {
        Self {
            visited: Vec::with_capacity(snapshot.len()),
            pending: snapshot.into(),
            removable: false,
            remover,
        }
    }

    /// Remove the element most recently returned by `next`.
    ///
    /// The live store is updated first. If that fails, nothing in the
    /// snapshot changes and the element stays removable.
    pub fn remove(&mut self) -> StoreResult<()> {
        if !self.removable {
            return Err(StoreError::invalid(
                "remove() must follow next(), at most once per element",
            ));
        }
        let current = match self.visited.last() {
            Some(item) => item,
            None => return Err(StoreError::invalid("no current element")),
        };
        self.remover.remove_live(current)?;
        self.visited.pop();
        self.removable = false;
        Ok(())
    }

    /// Elements not yet visited, in snapshot order.
    pub fn remaining(&self) -> impl Iterator<Item = &T> {
        self.pending.iter()
    }

    /// Current snapshot size, removals included.
    pub fn len(&self) -> usize {
        self.visited.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The snapshot as it stands after removals.
    pub fn into_snapshot(self) -> Vec<T> {
        let mut all = self.visited;
        all.extend(self.pending);
        all
    }
}

impl<T: Clone, R: LiveRemover<T>> Iterator for SnapshotIter<T, R> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let item = self.pending.pop_front()?;
        self.visited.push(item.clone());
        self.removable = true;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.pending.len(), Some(self.pending.len()))
    }
}

impl<T, R> std::fmt::Debug for SnapshotIter<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotIter")
            .field("visited", &self.visited.len())
            .field("pending", &self.pending.len())
            .field("removable", &self.removable)
            .finish()
    }
}
