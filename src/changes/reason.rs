//! The closed set of reasons a keyed collection can change

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a key appears in a change set.
///
/// The set is closed on purpose: every consumer matches exhaustively, so a
/// reason that is not handled fails to compile instead of slipping through
/// at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeReason {
    /// The key entered the collection
    Add,
    /// The key's value was replaced
    Update,
    /// The key left the collection
    Remove,
    /// The value is unchanged but downstream should re-announce it
    Refresh,
    /// Re-apply bookkeeping for the key without any new data
    Evaluate,
}

impl ChangeReason {
    /// Whether a change with this reason carries the prior value when one
    /// existed.
    ///
    /// `Add` and `Evaluate` never carry a previous value; the other reasons
    /// do whenever the collection held one before.
    #[must_use]
    pub fn expects_previous(self) -> bool {
        matches!(
            self,
            ChangeReason::Update | ChangeReason::Remove | ChangeReason::Refresh
        )
    }
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeReason::Add => "Add",
            ChangeReason::Update => "Update",
            ChangeReason::Remove => "Remove",
            ChangeReason::Refresh => "Refresh",
            ChangeReason::Evaluate => "Evaluate",
        };
        write!(f, "{}", name)
    }
}
