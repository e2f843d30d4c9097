//! Error types for change stream delivery

use thiserror::Error;

/// Errors that can occur while publishing to a change stream
#[derive(Error, Debug)]
pub enum StreamError {
    /// Delivery to one or more subscribers failed
    #[error("failed to deliver event: {reason}")]
    SendFailed { reason: String },

    /// The stream already carried a terminal event
    #[error("stream is closed")]
    Closed,
}

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors for async reception with a timeout
#[derive(Error, Debug, Clone)]
pub enum AsyncRecvError {
    #[error("Timeout while waiting for event")]
    Timeout,
    #[error("Channel disconnected")]
    Disconnected,
}

/// Errors for async try_recv
#[derive(Error, Debug, Clone)]
pub enum AsyncTryRecvError {
    #[error("No event available")]
    Empty,
    #[error("Channel disconnected")]
    Disconnected,
}
