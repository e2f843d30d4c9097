//! Handles to running activations
//!
//! An activation owns its worker, its cache (inside the worker) and its
//! downstream stream. Dropping the handle stops the worker; nothing is
//! emitted downstream after cancellation returns.

use crate::changes::ChangeSet;
use crate::stats::ActivationStats;
use crate::stream::{AsyncChangeStream, AsyncStreamConsumer, ChangeStream, StreamConsumer};
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::watch;
use uuid::Uuid;

/// Handle to one running thread-based activation
pub struct TransformActivation<K, D> {
    downstream: ChangeStream<ChangeSet<K, D>>,
    stats: Arc<Mutex<ActivationStats>>,
    cancelled: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    id: Uuid,
}

impl<K, D> TransformActivation<K, D> {
    pub(super) fn new(
        downstream: ChangeStream<ChangeSet<K, D>>,
        stats: Arc<Mutex<ActivationStats>>,
        cancelled: Arc<AtomicBool>,
        worker: JoinHandle<()>,
        id: Uuid,
    ) -> Self {
        Self {
            downstream,
            stats,
            cancelled,
            worker: Some(worker),
            id,
        }
    }

    /// Returns the identifier this activation logs under.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns a snapshot of the activation's counters.
    #[must_use]
    pub fn stats(&self) -> ActivationStats {
        self.stats.lock().unwrap().clone()
    }

    /// Whether [`cancel`](TransformActivation::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Stops the worker and releases both input subscriptions.
    ///
    /// Blocks until the worker thread has exited, so once this returns no
    /// further event reaches downstream consumers. Idempotent. No terminal
    /// event is emitted; cancellation is silent by contract.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            info!("🛑 Cancelling activation {}", self.id);
            if worker.join().is_err() {
                error!("❌ Activation {} worker panicked", self.id);
            }
        }
    }
}

impl<K: Clone, D: Clone> TransformActivation<K, D> {
    /// Subscribe to the change sets this activation emits.
    ///
    /// May be called more than once; every subscriber sees every emission
    /// from the moment it subscribed. Subscribe before feeding the source
    /// to observe the first batch.
    pub fn subscribe(&self) -> StreamConsumer<ChangeSet<K, D>> {
        self.downstream.subscribe()
    }
}

impl<K, D> Drop for TransformActivation<K, D> {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Handle to one running task-based activation
pub struct AsyncTransformActivation<K, D> {
    downstream: AsyncChangeStream<ChangeSet<K, D>>,
    stats: Arc<Mutex<ActivationStats>>,
    shutdown: watch::Sender<bool>,
    worker: Option<tokio::task::JoinHandle<()>>,
    id: Uuid,
}

impl<K, D> AsyncTransformActivation<K, D> {
    pub(super) fn new(
        downstream: AsyncChangeStream<ChangeSet<K, D>>,
        stats: Arc<Mutex<ActivationStats>>,
        shutdown: watch::Sender<bool>,
        worker: tokio::task::JoinHandle<()>,
        id: Uuid,
    ) -> Self {
        Self {
            downstream,
            stats,
            shutdown,
            worker: Some(worker),
            id,
        }
    }

    /// Returns the identifier this activation logs under.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns a snapshot of the activation's counters.
    #[must_use]
    pub fn stats(&self) -> ActivationStats {
        self.stats.lock().unwrap().clone()
    }

    /// Whether [`cancel`](AsyncTransformActivation::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Signals the worker to stop at its next scheduling point.
    ///
    /// Returns immediately; use
    /// [`cancel_and_join`](AsyncTransformActivation::cancel_and_join) to
    /// wait for the worker to be gone.
    pub fn cancel(&mut self) {
        let _ = self.shutdown.send(true);
        info!("🛑 Cancelling async activation {}", self.id);
    }

    /// Cancels and waits until the worker task has exited.
    pub async fn cancel_and_join(mut self) {
        self.cancel();
        if let Some(worker) = self.worker.take() {
            if worker.await.is_err() {
                error!("❌ Activation {} worker panicked", self.id);
            }
        }
    }
}

impl<K: Clone, D: Clone> AsyncTransformActivation<K, D> {
    /// Subscribe to the change sets this activation emits.
    pub async fn subscribe(&self) -> AsyncStreamConsumer<ChangeSet<K, D>> {
        self.downstream.subscribe().await
    }
}

impl<K, D> Drop for AsyncTransformActivation<K, D> {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
