//! Statistics kept per operator activation

use std::time::Instant;

/// Counters an activation's worker maintains while it runs
#[derive(Debug, Clone, Default)]
pub struct ActivationStats {
    /// Triggers taken off the funnel (source batches plus retransforms)
    pub triggers_processed: u64,
    /// Items that transformed or resolved successfully
    pub items_transformed: u64,
    /// Items whose outcome was a captured failure
    pub items_failed: u64,
    /// Change sets emitted downstream, empty ones included
    pub sets_emitted: u64,
    pub last_activity: Option<Instant>,
}

impl ActivationStats {
    /// Create new stats with current timestamp
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_activity: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Update last activity timestamp
    pub fn update_activity(&mut self) {
        self.last_activity = Some(Instant::now());
    }

    /// Record one processed trigger and its per-item outcomes
    pub fn record_trigger(&mut self, transformed: u64, failed: u64) {
        self.triggers_processed += 1;
        self.items_transformed += transformed;
        self.items_failed += failed;
        self.update_activity();
    }

    /// Record one downstream emission
    pub fn record_emission(&mut self) {
        self.sets_emitted += 1;
        self.update_activity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_new_stats_start_at_zero() {
        let stats = ActivationStats::new();
        assert_eq!(stats.triggers_processed, 0);
        assert_eq!(stats.items_transformed, 0);
        assert_eq!(stats.items_failed, 0);
        assert_eq!(stats.sets_emitted, 0);
        assert!(stats.last_activity.is_some());
    }

    #[test]
    fn test_record_trigger_accumulates() {
        let mut stats = ActivationStats::new();
        stats.record_trigger(3, 1);
        stats.record_trigger(2, 0);

        assert_eq!(stats.triggers_processed, 2);
        assert_eq!(stats.items_transformed, 5);
        assert_eq!(stats.items_failed, 1);
    }

    #[test]
    fn test_activity_timestamp_moves_forward() {
        let mut stats = ActivationStats::new();
        let initial_time = stats.last_activity.unwrap();

        thread::sleep(Duration::from_millis(10));
        stats.record_emission();

        let updated_time = stats.last_activity.unwrap();
        assert!(updated_time > initial_time);
        assert_eq!(stats.sets_emitted, 1);
    }
}
