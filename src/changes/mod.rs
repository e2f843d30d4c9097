//! # Change vocabulary for keyed collections
//!
//! The types here describe how a keyed collection moved from one state to the
//! next: a [`Change`] records what happened to a single key, a [`ChangeSet`]
//! batches those changes into one atomic notification, and [`ChangeReason`]
//! is the closed set of things that can happen to a key.
//!
//! ## Usage Example
//! ```rust
//! use deltafold::changes::{Change, ChangeReason, ChangeSet};
//!
//! let set = ChangeSet::from(vec![
//!     Change::add("user-1".to_string(), 42),
//!     Change::update("user-1".to_string(), 43, 42),
//! ]);
//!
//! assert_eq!(set.len(), 2);
//! assert_eq!(set.iter().next().map(Change::reason), Some(ChangeReason::Add));
//! ```

pub use change::Change;
pub use change_set::ChangeSet;
pub use reason::ChangeReason;

mod change;
mod change_set;
mod reason;
