//! Per-trigger processing shared by the thread and task workers
//!
//! Everything here is pure with respect to delivery: the engine pass, sink
//! notification, cache application and capture happen synchronously, and
//! the caller decides how to emit the outcome.

use super::RetransformPredicate;
use crate::cache::{CacheEntry, DiffCache};
use crate::changes::{Change, ChangeReason, ChangeSet};
use crate::engine::{TransformEngine, TransformResult};
use crate::error::{ErrorSink, TransformError, TransformFailure};
use std::fmt::Debug;
use std::hash::Hash;

/// What one trigger produced: the change set to emit plus per-item counts
/// for the activation stats.
#[derive(Debug)]
pub(super) struct BatchOutcome<K, D> {
    pub set: ChangeSet<K, D>,
    pub transformed: u64,
    pub failed: u64,
}

/// Runs one batch through the engine, routes failures to the sink, applies
/// successes to the cache and captures the resulting change set.
///
/// An `Err` means the batch aborted before anything was applied: either no
/// sink was configured and an item failed, or an unsupported change reason
/// turned up. The cache is untouched in that case.
pub(super) fn process_batch<K, S, D>(
    engine: &TransformEngine<K, S, D>,
    cache: &mut DiffCache<K, S, D>,
    error_sink: Option<&ErrorSink<K, S>>,
    batch: &ChangeSet<K, S>,
) -> Result<BatchOutcome<K, D>, TransformError>
where
    K: Eq + Hash + Clone + Debug,
    S: Clone,
    D: Clone,
{
    let results = engine.process(cache, batch)?;

    let mut successes = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            TransformResult::Success { entry, change } => successes.push((entry, change)),
            TransformResult::Failure { error, change } => failures.push((error, change)),
        }
    }
    let transformed = successes.len() as u64;
    let failed = failures.len() as u64;

    if let Some(sink) = error_sink {
        for (error, change) in failures {
            sink(TransformFailure::new(
                error,
                change.key().clone(),
                change.current().clone(),
            ));
        }
    }

    for (entry, change) in successes {
        match change.reason() {
            ChangeReason::Add | ChangeReason::Update => cache.add_or_update(entry),
            ChangeReason::Remove => cache.remove(change.key()),
            ChangeReason::Evaluate => cache.evaluate(change.key()),
            ChangeReason::Refresh => {
                // the engine rejects Refresh before producing any result
            }
        }
    }

    let set = cache.capture_changes().map(CacheEntry::into_derived);
    Ok(BatchOutcome {
        set,
        transformed,
        failed,
    })
}

/// Builds the synthetic batch for a forced re-transform: one `Update` per
/// cached item the predicate selects, with the cached source value standing
/// in as both current and previous.
///
/// Synthesis order follows cache iteration order, which is unspecified.
pub(super) fn synthesize_retransform<K, S, D>(
    cache: &DiffCache<K, S, D>,
    predicate: &RetransformPredicate<K, S>,
) -> ChangeSet<K, S>
where
    K: Eq + Hash + Clone,
    S: Clone,
    D: Clone,
{
    let mut synthetic = ChangeSet::new();
    for entry in cache.iter() {
        if predicate(entry.source(), entry.key()) {
            synthetic.push(Change::update(
                entry.key().clone(),
                entry.source().clone(),
                entry.source().clone(),
            ));
        }
    }
    synthetic
}
