use super::ChangeReason;
use serde::{Deserialize, Serialize};

/// A single mutation of one key in a keyed collection.
///
/// Each change records:
/// - The reason the key changed
/// - The key itself
/// - The value after the change
/// - The value before the change, when the reason carries one
/// - Optional positional indexes for sorted downstreams
///
/// The previous value is present only for `Update`, `Remove` and `Refresh`
/// changes where a prior value actually existed. The constructors enforce
/// that rule, so a `Change` in the wild can be trusted to uphold it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change<K, V> {
    reason: ChangeReason,
    key: K,
    current: V,
    previous: Option<V>,
    current_index: Option<usize>,
    previous_index: Option<usize>,
}

impl<K, V> Change<K, V> {
    fn new(reason: ChangeReason, key: K, current: V, previous: Option<V>) -> Self {
        Self {
            reason,
            key,
            current,
            previous,
            current_index: None,
            previous_index: None,
        }
    }

    /// Creates an `Add` change announcing a new key.
    #[must_use]
    pub fn add(key: K, current: V) -> Self {
        Self::new(ChangeReason::Add, key, current, None)
    }

    /// Creates an `Update` change replacing `previous` with `current`.
    #[must_use]
    pub fn update(key: K, current: V, previous: V) -> Self {
        Self::new(ChangeReason::Update, key, current, Some(previous))
    }

    /// Creates a `Remove` change for a key leaving the collection.
    ///
    /// `current` is the value being removed; `previous` carries the prior
    /// value when the producer knows it.
    #[must_use]
    pub fn remove(key: K, current: V, previous: Option<V>) -> Self {
        Self::new(ChangeReason::Remove, key, current, previous)
    }

    /// Creates a `Refresh` change re-announcing an unchanged value.
    #[must_use]
    pub fn refresh(key: K, current: V, previous: Option<V>) -> Self {
        Self::new(ChangeReason::Refresh, key, current, previous)
    }

    /// Creates an `Evaluate` change re-applying bookkeeping for a key.
    #[must_use]
    pub fn evaluate(key: K, current: V) -> Self {
        Self::new(ChangeReason::Evaluate, key, current, None)
    }

    /// Attaches positional indexes for sorted downstreams.
    ///
    /// Indexes default to `None` and travel through value mappings untouched.
    #[must_use]
    pub fn with_indexes(mut self, current_index: Option<usize>, previous_index: Option<usize>) -> Self {
        self.current_index = current_index;
        self.previous_index = previous_index;
        self
    }

    /// Returns why the key changed.
    #[must_use]
    pub fn reason(&self) -> ChangeReason {
        self.reason
    }

    /// Returns the key that changed.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns the value after the change.
    #[must_use]
    pub fn current(&self) -> &V {
        &self.current
    }

    /// Returns the value before the change, when one existed and the reason
    /// carries it.
    #[must_use]
    pub fn previous(&self) -> Option<&V> {
        self.previous.as_ref()
    }

    /// Returns the position downstream should place the value at, if known.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Returns the position the value previously occupied, if known.
    #[must_use]
    pub fn previous_index(&self) -> Option<usize> {
        self.previous_index
    }

    /// Maps the carried values into another type, preserving reason, key and
    /// indexes.
    ///
    /// Both `current` and `previous` go through the same mapping, so the
    /// previous-value invariant survives the projection.
    #[must_use]
    pub fn map<U, F>(self, mut f: F) -> Change<K, U>
    where
        F: FnMut(V) -> U,
    {
        let current = f(self.current);
        let previous = self.previous.map(&mut f);
        Change {
            reason: self.reason,
            key: self.key,
            current,
            previous,
            current_index: self.current_index,
            previous_index: self.previous_index,
        }
    }
}
