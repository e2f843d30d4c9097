use super::Change;
use serde::{Deserialize, Serialize};

/// An ordered batch of changes delivered as one atomic notification.
///
/// Order is significant: a remove and a re-add of the same key within one
/// set must stay in their causal order, and consumers apply the set front
/// to back. An empty set is a valid notification and means "this trigger
/// produced no visible change".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet<K, V> {
    changes: Vec<Change<K, V>>,
}

impl<K, V> ChangeSet<K, V> {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self { changes: Vec::new() }
    }

    /// Appends a change at the end of the set.
    pub fn push(&mut self, change: Change<K, V>) {
        self.changes.push(change);
    }

    /// Returns the number of changes in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true when the set carries no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Iterates the changes in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, Change<K, V>> {
        self.changes.iter()
    }

    /// Maps every carried value into another type, preserving order.
    #[must_use]
    pub fn map<U, F>(self, mut f: F) -> ChangeSet<K, U>
    where
        F: FnMut(V) -> U,
    {
        ChangeSet {
            changes: self.changes.into_iter().map(|c| c.map(&mut f)).collect(),
        }
    }
}

impl<K, V> Default for ChangeSet<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> From<Vec<Change<K, V>>> for ChangeSet<K, V> {
    fn from(changes: Vec<Change<K, V>>) -> Self {
        Self { changes }
    }
}

impl<K, V> FromIterator<Change<K, V>> for ChangeSet<K, V> {
    fn from_iter<I: IntoIterator<Item = Change<K, V>>>(iter: I) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

impl<K, V> IntoIterator for ChangeSet<K, V> {
    type Item = Change<K, V>;
    type IntoIter = std::vec::IntoIter<Change<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a ChangeSet<K, V> {
    type Item = &'a Change<K, V>;
    type IntoIter = std::slice::Iter<'a, Change<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
