//! Consolidated testing utilities for pipeline setup and common test patterns
//!
//! This module eliminates duplicate transform and sink setup code shared by
//! the unit and integration tests.

use crate::changes::{Change, ChangeSet};
use crate::engine::TransformFn;
use crate::error::{ErrorSink, TransformFailure};
use std::sync::{Arc, Mutex};

/// Consolidated transform and sink creation for tests
pub struct TestPipelineFactory;

impl TestPipelineFactory {
    /// Create a transform that uppercases the source string
    pub fn uppercase_transform() -> TransformFn<String, String, String> {
        Arc::new(|source: &String, _previous: Option<&String>, _key: &String| {
            Ok(source.to_uppercase())
        })
    }

    /// Create a transform that fails whenever the source equals `poison`
    pub fn failing_transform(poison: &str) -> TransformFn<String, String, String> {
        let poison = poison.to_string();
        Arc::new(
            move |source: &String, _previous: Option<&String>, _key: &String| {
                if source == &poison {
                    Err(format!("poisoned value: {}", source).into())
                } else {
                    Ok(source.to_uppercase())
                }
            },
        )
    }

    /// Create a transform that counts how many times each item was derived,
    /// producing values like `a#1`, `a#2` for successive passes over `a`
    pub fn counting_transform() -> TransformFn<String, String, String> {
        let passes: Arc<Mutex<std::collections::HashMap<String, u64>>> =
            Arc::new(Mutex::new(std::collections::HashMap::new()));
        Arc::new(
            move |source: &String, _previous: Option<&String>, key: &String| {
                let mut passes = passes.lock().unwrap();
                let count = passes.entry(key.clone()).or_insert(0);
                *count += 1;
                Ok(format!("{}#{}", source, count))
            },
        )
    }

    /// Create an error sink that records every failure it receives
    pub fn collecting_sink() -> (
        ErrorSink<String, String>,
        Arc<Mutex<Vec<TransformFailure<String, String>>>>,
    ) {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let sink_collected = Arc::clone(&collected);
        let sink: ErrorSink<String, String> =
            Arc::new(move |failure| sink_collected.lock().unwrap().push(failure));
        (sink, collected)
    }

    /// Build a change set of adds from key/value pairs
    pub fn adds(pairs: &[(&str, &str)]) -> ChangeSet<String, String> {
        pairs
            .iter()
            .map(|(key, value)| Change::add(key.to_string(), value.to_string()))
            .collect()
    }

    /// Build a change set of updates from key/current/previous triples
    pub fn updates(triples: &[(&str, &str, &str)]) -> ChangeSet<String, String> {
        triples
            .iter()
            .map(|(key, current, previous)| {
                Change::update(key.to_string(), current.to_string(), previous.to_string())
            })
            .collect()
    }
}
