//! Common test utilities and fixtures for transform operator tests
//!
//! This module provides shared functionality for the integration tests:
//! a fully wired activation over string values plus receive helpers.

use deltafold::testing_utils::TestPipelineFactory;
use deltafold::{
    ChangeSet, ChangeStream, RetransformPredicate, StreamConsumer, StreamEvent,
    TransformActivation, TransformFailure, TransformOperator,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How long tests wait for the worker to deliver an emission
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Common test fixture wiring a full activation over string values
pub struct CommonTestFixture {
    pub source: ChangeStream<ChangeSet<String, String>>,
    pub retransform: ChangeStream<RetransformPredicate<String, String>>,
    pub activation: TransformActivation<String, String>,
    pub derived: StreamConsumer<ChangeSet<String, String>>,
    /// Failures routed to the error sink; stays empty for fixtures without one
    pub failures: Arc<Mutex<Vec<TransformFailure<String, String>>>>,
}

impl CommonTestFixture {
    /// Fixture with an uppercasing transform and no error sink
    pub fn uppercase() -> Self {
        Self::build(TransformOperator::new(
            TestPipelineFactory::uppercase_transform(),
        ))
    }

    /// Fixture with an uppercasing transform and a collecting error sink
    pub fn uppercase_with_sink() -> Self {
        let (sink, failures) = TestPipelineFactory::collecting_sink();
        let operator = TransformOperator::new(TestPipelineFactory::uppercase_transform())
            .with_error_sink(sink);
        let mut fixture = Self::build(operator);
        fixture.failures = failures;
        fixture
    }

    /// Fixture with a transform that fails on `poison` and no error sink
    pub fn failing(poison: &str) -> Self {
        Self::build(TransformOperator::new(
            TestPipelineFactory::failing_transform(poison),
        ))
    }

    /// Fixture with a transform that fails on `poison` and a collecting sink
    pub fn failing_with_sink(poison: &str) -> Self {
        let (sink, failures) = TestPipelineFactory::collecting_sink();
        let operator = TransformOperator::new(TestPipelineFactory::failing_transform(poison))
            .with_error_sink(sink);
        let mut fixture = Self::build(operator);
        fixture.failures = failures;
        fixture
    }

    /// Fixture with a counting transform so repeated derivation is observable
    pub fn counting() -> Self {
        Self::build(TransformOperator::new(
            TestPipelineFactory::counting_transform(),
        ))
    }

    fn build(operator: TransformOperator<String, String, String>) -> Self {
        let source = ChangeStream::new();
        let retransform = ChangeStream::new();
        let activation = operator.activate(source.subscribe(), Some(retransform.subscribe()));
        let derived = activation.subscribe();
        Self {
            source,
            retransform,
            activation,
            derived,
            failures: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Receive the next downstream event, panicking when nothing arrives in time
    pub fn recv_event(&mut self) -> StreamEvent<ChangeSet<String, String>> {
        self.derived
            .recv_timeout(RECV_TIMEOUT)
            .expect("Timed out waiting for a downstream event")
    }

    /// Receive the next downstream event and unwrap the change set it carries
    pub fn recv_set(&mut self) -> ChangeSet<String, String> {
        match self.recv_event() {
            StreamEvent::Next(set) => set,
            other => panic!("Expected a change set event, got {:?}", other),
        }
    }

    /// Assert that no downstream event arrives within a short window
    pub fn assert_no_event(&mut self) {
        if let Ok(event) = self.derived.recv_timeout(Duration::from_millis(200)) {
            panic!("Expected no downstream event, got {:?}", event);
        }
    }
}

/// Collect (key, current value) pairs from a change set, sorted by key
pub fn sorted_pairs(set: &ChangeSet<String, String>) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = set
        .iter()
        .map(|change| (change.key().clone(), change.current().clone()))
        .collect();
    pairs.sort();
    pairs
}

/// Initialize logging for the test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
