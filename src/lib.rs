//! # Deltafold
//!
//! This library keeps a keyed, derived collection continuously in sync with a
//! live source collection. Changes to the source arrive as ordered batches, an
//! injected transform maps each source value to a derived value, and every
//! trigger produces exactly one downstream batch describing what changed in
//! the derived collection. A second input can force selected cached items to
//! be re-derived even though their source values did not change.
//!
//! ## Core Components
//!
//! * `changes` - Change and batch vocabulary shared by every stage
//! * `cache` - Keyed diff cache pairing each source value with its derived value
//! * `engine` - Per-item transform pass with error capture
//! * `operator` - Activation surface merging source batches and re-transform requests
//! * `stream` - Ordered fan-out delivery with completion and failure signals
//! * `stats` - Per-activation processing counters
//! * `error` - Error types and the error sink contract
//!
//! ## Architecture
//!
//! Each activation owns a private cache and a single worker (thread or tokio
//! task) that serializes both trigger inputs, so no external locking is ever
//! needed around the cache. Failures are data: with an error sink configured
//! the stream keeps flowing past failed items, without one the first failure
//! ends the stream.
//!
//! ## Usage Example
//! ```rust
//! use deltafold::{Change, ChangeSet, ChangeStream, StreamEvent, TransformFn, TransformOperator};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let source: ChangeStream<ChangeSet<String, u64>> = ChangeStream::new();
//!
//! let transform: TransformFn<String, u64, u64> =
//!     Arc::new(|source, _previous, _key| Ok(source * 10));
//! let operator = TransformOperator::new(transform);
//!
//! let mut activation = operator.activate(source.subscribe(), None);
//! let mut derived = activation.subscribe();
//!
//! source
//!     .publish(ChangeSet::from(vec![Change::add("score".to_string(), 4)]))
//!     .unwrap();
//!
//! match derived.recv_timeout(Duration::from_secs(2)).unwrap() {
//!     StreamEvent::Next(set) => {
//!         let change = set.iter().next().unwrap();
//!         assert_eq!(change.current(), &40);
//!     }
//!     other => panic!("expected a change set, got {:?}", other),
//! }
//! activation.cancel();
//! ```

pub mod cache;
pub mod changes;
pub mod constants;
pub mod engine;
pub mod error;
pub mod operator;
pub mod stats;
pub mod stream;
pub mod testing_utils;

// Re-export main types for convenience
pub use cache::{CacheEntry, DiffCache};
pub use changes::{Change, ChangeReason, ChangeSet};
pub use engine::{TransformEngine, TransformFn, TransformResult};
pub use error::{BoxedTransformFault, ErrorSink, TransformError, TransformFailure};
pub use operator::{
    AsyncTransformActivation, RetransformPredicate, TransformActivation, TransformOperator,
};
pub use stats::ActivationStats;
pub use stream::{
    AsyncChangeStream, AsyncRecvError, AsyncStreamConsumer, AsyncTryRecvError, ChangeStream,
    StreamConsumer, StreamError, StreamEvent, StreamFault, StreamResult,
};
