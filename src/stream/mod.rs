//! # Ordered change delivery between pipeline stages
//!
//! A small pub/sub layer that carries whole change batches, in order, with
//! distinct completion and failure signals. It exists so the operator can
//! treat "a batch arrived", "the source is done" and "the source broke" as
//! three different events instead of guessing from a closed channel.
//!
//! Two flavors are provided:
//!
//! - [`sync_stream`] - [`ChangeStream`] / [`StreamConsumer`] over
//!   `std::sync::mpsc`, for thread-based pipelines
//! - [`async_stream`] - [`AsyncChangeStream`] / [`AsyncStreamConsumer`] over
//!   `tokio::sync::mpsc`, for task-based pipelines
//!
//! Both fan events out to every subscriber, reject publishing after a
//! terminal event, and replay the terminal event to late subscribers.
//!
//! ## Usage Example
//! ```rust
//! use deltafold::stream::{ChangeStream, StreamEvent};
//!
//! let stream = ChangeStream::new();
//! let mut consumer = stream.subscribe();
//!
//! stream.publish(41).unwrap();
//! stream.complete().unwrap();
//!
//! assert!(matches!(consumer.try_recv(), Ok(StreamEvent::Next(41))));
//! assert!(matches!(consumer.try_recv(), Ok(StreamEvent::Completed)));
//! assert!(stream.publish(42).is_err());
//! ```

pub use async_stream::{AsyncChangeStream, AsyncStreamConsumer};
pub use error_handling::{AsyncRecvError, AsyncTryRecvError, StreamError, StreamResult};
pub use event::{StreamEvent, StreamFault};
pub use sync_stream::{ChangeStream, StreamConsumer};

mod async_stream;
mod error_handling;
mod event;
mod sync_stream;
