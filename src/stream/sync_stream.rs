//! Synchronous change stream over std::sync::mpsc

use super::error_handling::{StreamError, StreamResult};
use super::event::{StreamEvent, StreamFault};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Consumer handle for receiving events from one stream
pub struct StreamConsumer<T> {
    receiver: Receiver<StreamEvent<T>>,
}

impl<T> StreamConsumer<T> {
    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<StreamEvent<T>, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive an event, blocking until one is available
    pub fn recv(&mut self) -> Result<StreamEvent<T>, mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event with a timeout
    pub fn recv_timeout(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<StreamEvent<T>, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Get an iterator over received events
    pub fn iter(&mut self) -> mpsc::Iter<'_, StreamEvent<T>> {
        self.receiver.iter()
    }
}

struct StreamShared<T> {
    senders: Vec<Sender<StreamEvent<T>>>,
    terminal: Option<StreamEvent<T>>,
}

/// Ordered fan-out stream for one payload type.
///
/// Every subscriber receives every event published after it subscribed, in
/// publication order. Once a terminal event has been published the stream
/// is closed: further publishes fail with [`StreamError::Closed`], and
/// subscribers arriving late receive the terminal event straight away.
pub struct ChangeStream<T> {
    shared: Arc<Mutex<StreamShared<T>>>,
}

impl<T: Clone> ChangeStream<T> {
    /// Create a new open stream with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(StreamShared {
                senders: Vec::new(),
                terminal: None,
            })),
        }
    }

    /// Subscribe to events published from now on.
    ///
    /// If the stream already ended, the terminal event is replayed to the
    /// new consumer immediately.
    pub fn subscribe(&self) -> StreamConsumer<T> {
        let (sender, receiver) = mpsc::channel();

        let mut shared = self.shared.lock().unwrap();
        if let Some(terminal) = &shared.terminal {
            let _ = sender.send(terminal.clone());
        } else {
            shared.senders.push(sender);
        }

        StreamConsumer { receiver }
    }

    /// Publish the next payload to all subscribers
    pub fn publish(&self, payload: T) -> StreamResult<()> {
        self.send_event(StreamEvent::Next(payload))
    }

    /// End the stream normally
    pub fn complete(&self) -> StreamResult<()> {
        self.send_event(StreamEvent::Completed)
    }

    /// End the stream with a failure
    pub fn fail(&self, fault: StreamFault) -> StreamResult<()> {
        self.send_event(StreamEvent::Failed(fault))
    }

    /// Whether a terminal event has been published
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.lock().unwrap().terminal.is_some()
    }

    /// Get the number of registered subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().unwrap().senders.len()
    }

    fn send_event(&self, event: StreamEvent<T>) -> StreamResult<()> {
        let mut shared = self.shared.lock().unwrap();

        if shared.terminal.is_some() {
            return Err(StreamError::Closed);
        }
        if event.is_terminal() {
            shared.terminal = Some(event.clone());
        }

        if shared.senders.is_empty() {
            // No subscribers yet - not an error
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

impl<T: Clone> Default for ChangeStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ChangeStream<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}
