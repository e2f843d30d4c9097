//! Thread-based activation worker
//!
//! One thread polls both trigger inputs and owns the cache, so all cache
//! access is serialized by construction. Polling follows the two-consumer
//! try_recv loop with a short idle sleep.

use super::processing::{process_batch, synthesize_retransform};
use super::RetransformPredicate;
use crate::cache::DiffCache;
use crate::changes::ChangeSet;
use crate::constants::WORKER_POLL_INTERVAL;
use crate::engine::TransformEngine;
use crate::error::ErrorSink;
use crate::stats::ActivationStats;
use crate::stream::{ChangeStream, StreamConsumer, StreamEvent};
use log::{error, info, warn};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::TryRecvError;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use uuid::Uuid;

/// Everything the worker thread owns for one activation
pub(super) struct WorkerConfig<K, S, D> {
    pub engine: TransformEngine<K, S, D>,
    pub error_sink: Option<ErrorSink<K, S>>,
    pub source: StreamConsumer<ChangeSet<K, S>>,
    pub retransform: Option<StreamConsumer<RetransformPredicate<K, S>>>,
    pub downstream: ChangeStream<ChangeSet<K, D>>,
    pub stats: Arc<Mutex<ActivationStats>>,
    pub cancelled: Arc<AtomicBool>,
    pub activation_id: Uuid,
}

pub(super) fn spawn<K, S, D>(config: WorkerConfig<K, S, D>) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    S: Clone + Send + 'static,
    D: Clone + Send + 'static,
{
    thread::spawn(move || run(config))
}

fn run<K, S, D>(config: WorkerConfig<K, S, D>)
where
    K: Eq + Hash + Clone + Debug,
    S: Clone,
    D: Clone,
{
    let WorkerConfig {
        engine,
        error_sink,
        mut source,
        mut retransform,
        downstream,
        stats,
        cancelled,
        activation_id,
    } = config;

    info!("🚀 Activation {} worker started", activation_id);
    let mut cache: DiffCache<K, S, D> = DiffCache::new();

    loop {
        if cancelled.load(Ordering::SeqCst) {
            info!("🛑 Activation {} cancellation observed", activation_id);
            break;
        }

        let mut idle = true;

        // Source change batches
        match source.try_recv() {
            Ok(StreamEvent::Next(batch)) => {
                idle = false;
                if !process_trigger(
                    &engine,
                    &mut cache,
                    error_sink.as_ref(),
                    &downstream,
                    &stats,
                    activation_id,
                    batch,
                ) {
                    break;
                }
            }
            Ok(StreamEvent::Completed) => {
                info!("✅ Activation {} source completed", activation_id);
                if let Err(e) = downstream.complete() {
                    warn!(
                        "⚠️ Activation {} could not propagate completion: {}",
                        activation_id, e
                    );
                }
                break;
            }
            Ok(StreamEvent::Failed(fault)) => {
                error!("❌ Activation {} source failed: {}", activation_id, fault);
                if let Err(e) = downstream.fail(fault) {
                    warn!(
                        "⚠️ Activation {} could not propagate failure: {}",
                        activation_id, e
                    );
                }
                break;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                warn!("⚠️ Activation {} source channel disconnected", activation_id);
                let _ = downstream.complete();
                break;
            }
        }

        // Forced re-transform requests
        if let Some(consumer) = retransform.as_mut() {
            match consumer.try_recv() {
                Ok(StreamEvent::Next(predicate)) => {
                    idle = false;
                    let synthetic = synthesize_retransform(&cache, &predicate);
                    info!(
                        "🔄 Activation {} forced re-transform selected {} of {} cached items",
                        activation_id,
                        synthetic.len(),
                        cache.len()
                    );
                    if !process_trigger(
                        &engine,
                        &mut cache,
                        error_sink.as_ref(),
                        &downstream,
                        &stats,
                        activation_id,
                        synthetic,
                    ) {
                        break;
                    }
                }
                Ok(StreamEvent::Completed) => {
                    info!("Activation {} re-transform input completed", activation_id);
                    retransform = None;
                }
                Ok(StreamEvent::Failed(fault)) => {
                    error!(
                        "❌ Activation {} re-transform input failed: {}",
                        activation_id, fault
                    );
                    let _ = downstream.fail(fault);
                    break;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    warn!(
                        "⚠️ Activation {} re-transform channel disconnected",
                        activation_id
                    );
                    retransform = None;
                }
            }
        }

        if idle {
            thread::sleep(WORKER_POLL_INTERVAL);
        }
    }

    info!("Activation {} worker stopped", activation_id);
}

/// Process one trigger end to end. Returns false when the activation must
/// stop because the batch failed fatally.
fn process_trigger<K, S, D>(
    engine: &TransformEngine<K, S, D>,
    cache: &mut DiffCache<K, S, D>,
    error_sink: Option<&ErrorSink<K, S>>,
    downstream: &ChangeStream<ChangeSet<K, D>>,
    stats: &Arc<Mutex<ActivationStats>>,
    activation_id: Uuid,
    batch: ChangeSet<K, S>,
) -> bool
where
    K: Eq + Hash + Clone + Debug,
    S: Clone,
    D: Clone,
{
    match process_batch(engine, cache, error_sink, &batch) {
        Ok(outcome) => {
            stats
                .lock()
                .unwrap()
                .record_trigger(outcome.transformed, outcome.failed);
            if let Err(e) = downstream.publish(outcome.set) {
                warn!(
                    "⚠️ Activation {} downstream delivery problem: {}",
                    activation_id, e
                );
            }
            stats.lock().unwrap().record_emission();
            true
        }
        Err(fatal) => {
            error!(
                "❌ Activation {} batch processing failed: {}",
                activation_id, fatal
            );
            stats.lock().unwrap().update_activity();
            if let Err(e) = downstream.fail(Arc::new(fatal)) {
                warn!(
                    "⚠️ Activation {} could not propagate failure: {}",
                    activation_id, e
                );
            }
            false
        }
    }
}
