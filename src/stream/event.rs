//! Events carried by change streams

use std::sync::Arc;

/// Shared fault delivered on a failed stream.
///
/// `Arc` rather than `Box` so one failure can fan out to every subscriber.
pub type StreamFault = Arc<dyn std::error::Error + Send + Sync>;

/// One delivery on a change stream: a payload, or one of the two terminal
/// signals.
///
/// After a terminal event, a stream never delivers again.
#[derive(Debug, Clone)]
pub enum StreamEvent<T> {
    /// The next payload, in order
    Next(T),
    /// The stream finished normally; no more payloads will arrive
    Completed,
    /// The stream failed; the fault explains why
    Failed(StreamFault),
}

impl<T> StreamEvent<T> {
    /// True for `Completed` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed | StreamEvent::Failed(_))
    }

    /// Returns the payload when this is a `Next` event.
    #[must_use]
    pub fn into_next(self) -> Option<T> {
        match self {
            StreamEvent::Next(payload) => Some(payload),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert!(!StreamEvent::Next(1).is_terminal());
        assert!(StreamEvent::<u32>::Completed.is_terminal());

        let fault: StreamFault =
            Arc::new(std::io::Error::new(std::io::ErrorKind::Other, "broken"));
        assert!(StreamEvent::<u32>::Failed(fault).is_terminal());
    }

    #[test]
    fn test_into_next() {
        assert_eq!(StreamEvent::Next(5).into_next(), Some(5));
        assert_eq!(StreamEvent::<u32>::Completed.into_next(), None);
    }
}
