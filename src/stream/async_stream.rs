//! Asynchronous change stream over tokio::sync::mpsc

use super::error_handling::{AsyncRecvError, AsyncTryRecvError, StreamError, StreamResult};
use super::event::{StreamEvent, StreamFault};
use std::sync::Arc;
use tokio::sync::mpsc as async_mpsc;
use tokio::time::{timeout, Duration};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Async consumer handle for receiving events from one stream
pub struct AsyncStreamConsumer<T> {
    receiver: async_mpsc::UnboundedReceiver<StreamEvent<T>>,
}

impl<T> AsyncStreamConsumer<T> {
    pub(crate) fn new(receiver: async_mpsc::UnboundedReceiver<StreamEvent<T>>) -> Self {
        Self { receiver }
    }

    /// Receive the next event, or `None` once the publisher side is gone
    pub async fn recv(&mut self) -> Option<StreamEvent<T>> {
        self.receiver.recv().await
    }

    /// Receive the next event with a timeout
    pub async fn recv_timeout(
        &mut self,
        duration: Duration,
    ) -> Result<StreamEvent<T>, AsyncRecvError> {
        match timeout(duration, self.receiver.recv()).await {
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(AsyncRecvError::Disconnected),
            Err(_) => Err(AsyncRecvError::Timeout),
        }
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<StreamEvent<T>, AsyncTryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(event),
            Err(async_mpsc::error::TryRecvError::Empty) => Err(AsyncTryRecvError::Empty),
            Err(async_mpsc::error::TryRecvError::Disconnected) => {
                Err(AsyncTryRecvError::Disconnected)
            }
        }
    }

    /// Adapt the consumer into a `tokio_stream` stream of events
    #[must_use]
    pub fn into_stream(self) -> UnboundedReceiverStream<StreamEvent<T>> {
        UnboundedReceiverStream::new(self.receiver)
    }
}

struct AsyncStreamShared<T> {
    senders: Vec<async_mpsc::UnboundedSender<StreamEvent<T>>>,
    terminal: Option<StreamEvent<T>>,
}

/// Ordered fan-out stream for async pipelines.
///
/// Same contract as [`ChangeStream`](super::ChangeStream): every subscriber
/// sees every event in publication order, terminal events close the stream,
/// and late subscribers get the terminal event replayed.
pub struct AsyncChangeStream<T> {
    shared: Arc<tokio::sync::Mutex<AsyncStreamShared<T>>>,
}

impl<T: Clone> AsyncChangeStream<T> {
    /// Create a new open stream with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(tokio::sync::Mutex::new(AsyncStreamShared {
                senders: Vec::new(),
                terminal: None,
            })),
        }
    }

    /// Subscribe to events published from now on
    pub async fn subscribe(&self) -> AsyncStreamConsumer<T> {
        let (sender, receiver) = async_mpsc::unbounded_channel();

        let mut shared = self.shared.lock().await;
        if let Some(terminal) = &shared.terminal {
            let _ = sender.send(terminal.clone());
        } else {
            shared.senders.push(sender);
        }

        AsyncStreamConsumer::new(receiver)
    }

    /// Publish the next payload to all subscribers
    pub async fn publish(&self, payload: T) -> StreamResult<()> {
        self.send_event(StreamEvent::Next(payload)).await
    }

    /// End the stream normally
    pub async fn complete(&self) -> StreamResult<()> {
        self.send_event(StreamEvent::Completed).await
    }

    /// End the stream with a failure
    pub async fn fail(&self, fault: StreamFault) -> StreamResult<()> {
        self.send_event(StreamEvent::Failed(fault)).await
    }

    /// Whether a terminal event has been published
    pub async fn is_closed(&self) -> bool {
        self.shared.lock().await.terminal.is_some()
    }

    /// Get the number of registered subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.shared.lock().await.senders.len()
    }

    async fn send_event(&self, event: StreamEvent<T>) -> StreamResult<()> {
        let mut shared = self.shared.lock().await;

        if shared.terminal.is_some() {
            return Err(StreamError::Closed);
        }
        if event.is_terminal() {
            shared.terminal = Some(event.clone());
        }

        if shared.senders.is_empty() {
            return Ok(());
        }

        let mut failed_sends = 0;
        let total_subscribers = shared.senders.len();

        for sender in &shared.senders {
            if sender.send(event.clone()).is_err() {
                failed_sends += 1;
            }
        }

        if failed_sends > 0 {
            return Err(StreamError::SendFailed {
                reason: format!(
                    "{} of {} subscribers failed to receive event",
                    failed_sends, total_subscribers
                ),
            });
        }

        Ok(())
    }
}

impl<T: Clone> Default for AsyncChangeStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for AsyncChangeStream<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}
