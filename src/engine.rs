//! Per-item transform pass over a change batch
//!
//! [`TransformEngine`] turns a batch of source changes into a vector of
//! per-item outcomes without touching the cache. Applying the successful
//! outcomes is the caller's job, which keeps a failed batch from leaving
//! the cache half-written.

use crate::cache::{CacheEntry, DiffCache};
use crate::changes::{Change, ChangeReason, ChangeSet};
use crate::error::{BoxedTransformFault, TransformError};
use std::any::type_name;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Injected mapping from a source value to its derived value.
///
/// Receives the current source value, the previous one when the change
/// carries it, and the key.
pub type TransformFn<K, S, D> =
    Arc<dyn Fn(&S, Option<&S>, &K) -> Result<D, BoxedTransformFault> + Send + Sync>;

/// Outcome of processing one change.
///
/// Both variants keep the originating change so the caller knows which
/// cache operation the outcome belongs to.
#[derive(Debug)]
pub enum TransformResult<K, S, D> {
    /// The change can be applied; `entry` is what the cache should hold
    /// (for removes and evaluates, the entry that is already held)
    Success {
        entry: CacheEntry<K, S, D>,
        change: Change<K, S>,
    },
    /// The change failed and was captured instead of aborting the batch
    Failure {
        error: TransformError,
        change: Change<K, S>,
    },
}

/// Runs the injected transform across a batch, one change at a time, in
/// input order.
///
/// With failure capture enabled, per-item errors become
/// [`TransformResult::Failure`] values and the rest of the batch keeps
/// processing. Without it, the first error aborts the whole batch before
/// anything is applied. An unsupported change reason aborts either way.
pub struct TransformEngine<K, S, D> {
    transform: TransformFn<K, S, D>,
    capture_failures: bool,
}

impl<K, S, D> TransformEngine<K, S, D>
where
    K: Eq + Hash + Clone + Debug,
    S: Clone,
    D: Clone,
{
    /// Creates an engine around the injected transform.
    #[must_use]
    pub fn new(transform: TransformFn<K, S, D>, capture_failures: bool) -> Self {
        Self {
            transform,
            capture_failures,
        }
    }

    /// Processes a batch against the cache, producing one outcome per
    /// change without mutating anything.
    ///
    /// Remove and Evaluate lookups see the live cache plus the not yet
    /// applied effects of earlier changes in the same batch, so an add
    /// followed by a remove of the same key resolves within one batch.
    pub fn process(
        &self,
        cache: &DiffCache<K, S, D>,
        changes: &ChangeSet<K, S>,
    ) -> Result<Vec<TransformResult<K, S, D>>, TransformError> {
        let mut results = Vec::with_capacity(changes.len());
        // Pending effects of this batch: Some = entry a success would insert,
        // None = a success would remove the key.
        let mut overlay: HashMap<K, Option<CacheEntry<K, S, D>>> = HashMap::new();

        for change in changes.iter() {
            match change.reason() {
                ChangeReason::Add | ChangeReason::Update => {
                    match (self.transform)(change.current(), change.previous(), change.key()) {
                        Ok(derived) => {
                            let entry = CacheEntry::new(
                                change.key().clone(),
                                change.current().clone(),
                                derived,
                            );
                            overlay.insert(change.key().clone(), Some(entry.clone()));
                            results.push(TransformResult::Success {
                                entry,
                                change: change.clone(),
                            });
                        }
                        Err(fault) => {
                            let error = TransformError::TransformFailed {
                                key: format!("{:?}", change.key()),
                                fault,
                            };
                            if self.capture_failures {
                                results.push(TransformResult::Failure {
                                    error,
                                    change: change.clone(),
                                });
                            } else {
                                return Err(error);
                            }
                        }
                    }
                }
                ChangeReason::Remove | ChangeReason::Evaluate => {
                    let existing = match overlay.get(change.key()) {
                        Some(Some(pending)) => Some(pending.clone()),
                        Some(None) => None,
                        None => cache.lookup(change.key()).cloned(),
                    };
                    match existing {
                        Some(entry) => {
                            if change.reason() == ChangeReason::Remove {
                                overlay.insert(change.key().clone(), None);
                            }
                            results.push(TransformResult::Success {
                                entry,
                                change: change.clone(),
                            });
                        }
                        None => {
                            let error = TransformError::MissingKey {
                                key: format!("{:?}", change.key()),
                                reason: change.reason(),
                                source_type: type_name::<S>(),
                                derived_type: type_name::<D>(),
                            };
                            if self.capture_failures {
                                results.push(TransformResult::Failure {
                                    error,
                                    change: change.clone(),
                                });
                            } else {
                                return Err(error);
                            }
                        }
                    }
                }
                ChangeReason::Refresh => {
                    return Err(TransformError::UnsupportedReason {
                        reason: ChangeReason::Refresh,
                    });
                }
            }
        }

        Ok(results)
    }
}
