//! Task-based activation worker
//!
//! The async twin of the thread worker: one tokio task owns the cache and
//! selects over the two trigger inputs plus a shutdown watch. Shutdown is
//! checked first so cancellation wins over a busy source.

use super::processing::{process_batch, synthesize_retransform};
use super::RetransformPredicate;
use crate::cache::DiffCache;
use crate::changes::ChangeSet;
use crate::engine::TransformEngine;
use crate::error::ErrorSink;
use crate::stats::ActivationStats;
use crate::stream::{AsyncChangeStream, AsyncStreamConsumer, StreamEvent};
use log::{error, info, warn};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Everything the worker task owns for one activation
pub(super) struct AsyncWorkerConfig<K, S, D> {
    pub engine: TransformEngine<K, S, D>,
    pub error_sink: Option<ErrorSink<K, S>>,
    pub source: AsyncStreamConsumer<ChangeSet<K, S>>,
    pub retransform: Option<AsyncStreamConsumer<RetransformPredicate<K, S>>>,
    pub downstream: AsyncChangeStream<ChangeSet<K, D>>,
    pub stats: Arc<Mutex<ActivationStats>>,
    pub shutdown: watch::Receiver<bool>,
    pub activation_id: Uuid,
}

pub(super) fn spawn<K, S, D>(config: AsyncWorkerConfig<K, S, D>) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    S: Clone + Send + 'static,
    D: Clone + Send + 'static,
{
    tokio::spawn(run(config))
}

async fn run<K, S, D>(config: AsyncWorkerConfig<K, S, D>)
where
    K: Eq + Hash + Clone + Debug,
    S: Clone,
    D: Clone,
{
    let AsyncWorkerConfig {
        engine,
        error_sink,
        mut source,
        mut retransform,
        downstream,
        stats,
        mut shutdown,
        activation_id,
    } = config;

    info!("🚀 Activation {} async worker started", activation_id);
    let mut cache: DiffCache<K, S, D> = DiffCache::new();

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("🛑 Activation {} cancellation observed", activation_id);
                    break;
                }
            }

            event = source.recv() => {
                match event {
                    Some(StreamEvent::Next(batch)) => {
                        if !process_trigger(
                            &engine,
                            &mut cache,
                            error_sink.as_ref(),
                            &downstream,
                            &stats,
                            activation_id,
                            batch,
                        )
                        .await
                        {
                            break;
                        }
                    }
                    Some(StreamEvent::Completed) => {
                        info!("✅ Activation {} source completed", activation_id);
                        if let Err(e) = downstream.complete().await {
                            warn!(
                                "⚠️ Activation {} could not propagate completion: {}",
                                activation_id, e
                            );
                        }
                        break;
                    }
                    Some(StreamEvent::Failed(fault)) => {
                        error!("❌ Activation {} source failed: {}", activation_id, fault);
                        if let Err(e) = downstream.fail(fault).await {
                            warn!(
                                "⚠️ Activation {} could not propagate failure: {}",
                                activation_id, e
                            );
                        }
                        break;
                    }
                    None => {
                        warn!("⚠️ Activation {} source channel disconnected", activation_id);
                        let _ = downstream.complete().await;
                        break;
                    }
                }
            }

            event = recv_retransform(&mut retransform) => {
                match event {
                    Some(StreamEvent::Next(predicate)) => {
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
                        )
                        .await
                        {
                            break;
                        }
                    }
                    Some(StreamEvent::Completed) => {
                        info!("Activation {} re-transform input completed", activation_id);
                        retransform = None;
                    }
                    Some(StreamEvent::Failed(fault)) => {
                        error!(
                            "❌ Activation {} re-transform input failed: {}",
                            activation_id, fault
                        );
                        let _ = downstream.fail(fault).await;
                        break;
                    }
                    None => {
                        warn!(
                            "⚠️ Activation {} re-transform channel disconnected",
                            activation_id
                        );
                        retransform = None;
                    }
                }
            }
        }
    }

    info!("Activation {} async worker stopped", activation_id);
}

/// Receive from the optional re-transform input, or park forever once that
/// input has ended.
async fn recv_retransform<K, S>(
    consumer: &mut Option<AsyncStreamConsumer<RetransformPredicate<K, S>>>,
) -> Option<StreamEvent<RetransformPredicate<K, S>>> {
    match consumer.as_mut() {
        Some(consumer) => consumer.recv().await,
        None => std::future::pending().await,
    }
}

/// Process one trigger end to end. Returns false when the activation must
/// stop because the batch failed fatally.
///
/// Takes the batch by value: a borrow held across the publish await would
/// require `K` and `S` to be `Sync` for the task future to stay `Send`.
async fn process_trigger<K, S, D>(
    engine: &TransformEngine<K, S, D>,
    cache: &mut DiffCache<K, S, D>,
    error_sink: Option<&ErrorSink<K, S>>,
    downstream: &AsyncChangeStream<ChangeSet<K, D>>,
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
            if let Err(e) = downstream.publish(outcome.set).await {
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
            if let Err(e) = downstream.fail(Arc::new(fatal)).await {
                warn!(
                    "⚠️ Activation {} could not propagate failure: {}",
                    activation_id, e
                );
            }
            false
        }
    }
}
