use std::time::Duration;

/// Common constants used across the deltafold pipeline.
///
/// How long the thread-based activation worker sleeps when neither
/// trigger input had an event ready.
pub const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(10);
