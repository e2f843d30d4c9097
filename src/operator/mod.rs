//! # Transform operator orchestration
//!
//! The operator connects a source of change batches to a derived, cached
//! view of them. Activating it wires up to two trigger inputs, a worker
//! that owns a [`DiffCache`](crate::cache::DiffCache), and one downstream
//! stream:
//!
//! - every source batch runs through the
//!   [`TransformEngine`](crate::engine::TransformEngine) and becomes exactly
//!   one downstream change set, empty sets included
//! - every forced re-transform request becomes a synthetic batch over the
//!   currently cached items, then follows the same path
//!
//! Both inputs feed a single worker, so cache reads, mutation and capture
//! for one trigger never interleave with another trigger's processing.
//! The worker comes in two flavors with identical semantics: a thread
//! ([`TransformOperator::activate`]) and a tokio task
//! ([`TransformOperator::activate_async`]).
//!
//! Failure policy is decided at construction: with an error sink, per-item
//! failures are reported there and the stream keeps flowing; without one,
//! the first failure aborts its batch before anything is applied and ends
//! the downstream with a failure event.

pub use activation::{AsyncTransformActivation, TransformActivation};

mod activation;
mod async_worker;
mod processing;
mod worker;

use crate::changes::ChangeSet;
use crate::engine::{TransformEngine, TransformFn};
use crate::error::ErrorSink;
use crate::stats::ActivationStats;
use crate::stream::{AsyncChangeStream, AsyncStreamConsumer, ChangeStream, StreamConsumer};
use log::info;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use uuid::Uuid;

/// Predicate selecting which cached items a forced re-transform touches.
///
/// Receives the cached source value and its key.
pub type RetransformPredicate<K, S> = Arc<dyn Fn(&S, &K) -> bool + Send + Sync>;

/// Keyed transform operator: keeps a derived collection in sync with a
/// live source collection.
///
/// The operator itself is passive configuration; each call to
/// [`activate`](TransformOperator::activate) or
/// [`activate_async`](TransformOperator::activate_async) spawns an
/// independent worker with its own empty cache. No state is shared between
/// activations and none survives cancellation.
pub struct TransformOperator<K, S, D> {
    transform: TransformFn<K, S, D>,
    error_sink: Option<ErrorSink<K, S>>,
}

impl<K, S, D> TransformOperator<K, S, D>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    S: Clone + Send + 'static,
    D: Clone + Send + 'static,
{
    /// Creates an operator around the injected transform function.
    ///
    /// Without an error sink, the first failing item aborts its whole
    /// batch and fails the downstream; errors are never silently dropped.
    #[must_use]
    pub fn new(transform: TransformFn<K, S, D>) -> Self {
        Self {
            transform,
            error_sink: None,
        }
    }

    /// Routes per-item failures to `sink` instead of failing the stream.
    ///
    /// The sink is called synchronously from the worker, once per failed
    /// item, before the batch's successes are applied.
    #[must_use]
    pub fn with_error_sink(mut self, sink: ErrorSink<K, S>) -> Self {
        self.error_sink = Some(sink);
        self
    }

    /// Spawns a thread-backed activation consuming `source` and, when
    /// given, `retransform`.
    ///
    /// Returns the handle owning the worker and the downstream stream.
    /// Subscribe on the handle before feeding the source to observe the
    /// first emission.
    pub fn activate(
        &self,
        source: StreamConsumer<ChangeSet<K, S>>,
        retransform: Option<StreamConsumer<RetransformPredicate<K, S>>>,
    ) -> TransformActivation<K, D> {
        let activation_id = Uuid::new_v4();
        let downstream: ChangeStream<ChangeSet<K, D>> = ChangeStream::new();
        let stats = Arc::new(Mutex::new(ActivationStats::new()));
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker = worker::spawn(worker::WorkerConfig {
            engine: TransformEngine::new(Arc::clone(&self.transform), self.error_sink.is_some()),
            error_sink: self.error_sink.clone(),
            source,
            retransform,
            downstream: downstream.clone(),
            stats: Arc::clone(&stats),
            cancelled: Arc::clone(&cancelled),
            activation_id,
        });

        info!("🚀 Activated transform operator as {}", activation_id);
        TransformActivation::new(downstream, stats, cancelled, worker, activation_id)
    }

    /// Spawns a task-backed activation with the same semantics as
    /// [`activate`](TransformOperator::activate).
    ///
    /// Must be called from within a tokio runtime.
    pub fn activate_async(
        &self,
        source: AsyncStreamConsumer<ChangeSet<K, S>>,
        retransform: Option<AsyncStreamConsumer<RetransformPredicate<K, S>>>,
    ) -> AsyncTransformActivation<K, D> {
        let activation_id = Uuid::new_v4();
        let downstream: AsyncChangeStream<ChangeSet<K, D>> = AsyncChangeStream::new();
        let stats = Arc::new(Mutex::new(ActivationStats::new()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = async_worker::spawn(async_worker::AsyncWorkerConfig {
            engine: TransformEngine::new(Arc::clone(&self.transform), self.error_sink.is_some()),
            error_sink: self.error_sink.clone(),
            source,
            retransform,
            downstream: downstream.clone(),
            stats: Arc::clone(&stats),
            shutdown: shutdown_rx,
            activation_id,
        });

        info!("🚀 Activated transform operator as {} (async)", activation_id);
        AsyncTransformActivation::new(downstream, stats, shutdown_tx, worker, activation_id)
    }
}
