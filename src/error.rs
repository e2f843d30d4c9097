//! Error types for the transform pipeline

use crate::changes::ChangeReason;
use std::sync::Arc;
use thiserror::Error;

/// Opaque fault returned by an injected transform function.
pub type BoxedTransformFault = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while processing one change through the pipeline
#[derive(Error, Debug)]
pub enum TransformError {
    /// The injected transform function failed for an item
    #[error("transform failed for key {key}: {fault}")]
    TransformFailed {
        key: String,
        #[source]
        fault: BoxedTransformFault,
    },

    /// A Remove or Evaluate referenced a key the cache does not hold
    #[error("{reason} received for key {key} missing from the cache ({source_type} -> {derived_type})")]
    MissingKey {
        key: String,
        reason: ChangeReason,
        source_type: &'static str,
        derived_type: &'static str,
    },

    /// A change reason this pipeline does not process reached the engine
    #[error("change reason {reason} is not supported by the transform pipeline")]
    UnsupportedReason { reason: ChangeReason },
}

impl TransformError {
    /// True for errors that must stop the pipeline even when an error sink
    /// is configured.
    ///
    /// An unsupported change reason is a wiring defect, not a data problem,
    /// so it never goes to the sink.
    #[must_use]
    pub fn is_always_fatal(&self) -> bool {
        matches!(self, TransformError::UnsupportedReason { .. })
    }
}

/// Everything the error sink learns about one failed item.
///
/// Carries the captured error together with the key and the source value
/// that was being processed when it surfaced.
#[derive(Debug)]
pub struct TransformFailure<K, S> {
    error: TransformError,
    key: K,
    source: S,
}

impl<K, S> TransformFailure<K, S> {
    /// Creates a failure record for the sink.
    #[must_use]
    pub fn new(error: TransformError, key: K, source: S) -> Self {
        Self { error, key, source }
    }

    /// Returns the captured error.
    #[must_use]
    pub fn error(&self) -> &TransformError {
        &self.error
    }

    /// Returns the key that was being processed.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns the source value that was being processed.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Decomposes the record into its parts.
    #[must_use]
    pub fn into_parts(self) -> (TransformError, K, S) {
        (self.error, self.key, self.source)
    }
}

/// Callback invoked once per failed item when error capture is enabled.
pub type ErrorSink<K, S> = Arc<dyn Fn(TransformFailure<K, S>) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let failed = TransformError::TransformFailed {
            key: "\"k1\"".to_string(),
            fault: "boom".to_string().into(),
        };
        assert!(failed.to_string().contains("transform failed for key"));
        assert!(failed.to_string().contains("boom"));

        let missing = TransformError::MissingKey {
            key: "\"k2\"".to_string(),
            reason: ChangeReason::Remove,
            source_type: "alloc::string::String",
            derived_type: "i64",
        };
        assert!(missing.to_string().contains("missing from the cache"));
        assert!(missing.to_string().contains("Remove"));
        assert!(missing.to_string().contains("i64"));

        let unsupported = TransformError::UnsupportedReason {
            reason: ChangeReason::Refresh,
        };
        assert!(unsupported.to_string().contains("Refresh"));
        assert!(unsupported.to_string().contains("not supported"));
    }

    #[test]
    fn test_only_unsupported_reason_is_always_fatal() {
        let unsupported = TransformError::UnsupportedReason {
            reason: ChangeReason::Refresh,
        };
        assert!(unsupported.is_always_fatal());

        let failed = TransformError::TransformFailed {
            key: "k".to_string(),
            fault: "boom".to_string().into(),
        };
        assert!(!failed.is_always_fatal());
    }

    #[test]
    fn test_failure_into_parts() {
        let failure = TransformFailure::new(
            TransformError::UnsupportedReason {
                reason: ChangeReason::Refresh,
            },
            "k1".to_string(),
            7_i32,
        );
        assert_eq!(failure.key(), "k1");
        assert_eq!(*failure.source(), 7);

        let (error, key, source) = failure.into_parts();
        assert!(error.is_always_fatal());
        assert_eq!(key, "k1");
        assert_eq!(source, 7);
    }
}
