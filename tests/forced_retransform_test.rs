//! Integration tests for forced re-transforms
//!
//! A predicate published on the second input re-derives matching cached
//! items even though their source values did not change. The counting
//! transform fixture makes each derivation pass observable as `value#n`.

mod common;

use common::{init_test_logging, sorted_pairs, CommonTestFixture};
use deltafold::testing_utils::TestPipelineFactory;
use deltafold::{Change, ChangeReason, ChangeSet, RetransformPredicate, StreamEvent};
use std::sync::Arc;

fn sorted_triples(
    set: &ChangeSet<String, String>,
) -> Vec<(String, String, Option<String>)> {
    let mut triples: Vec<(String, String, Option<String>)> = set
        .iter()
        .map(|change| {
            (
                change.key().clone(),
                change.current().clone(),
                change.previous().cloned(),
            )
        })
        .collect();
    triples.sort();
    triples
}

#[test]
fn test_predicate_selects_subset_for_re_derivation() {
    init_test_logging();
    let mut fixture = CommonTestFixture::counting();

    fixture
        .source
        .publish(TestPipelineFactory::adds(&[
            ("a", "keep-a"),
            ("b", "keep-b"),
            ("c", "skip-c"),
        ]))
        .expect("Failed to publish initial batch");
    let _ = fixture.recv_set();

    let predicate: RetransformPredicate<String, String> =
        Arc::new(|source: &String, _key: &String| source.starts_with("keep"));
    fixture
        .retransform
        .publish(predicate)
        .expect("Failed to publish predicate");

    let set = fixture.recv_set();
    assert!(set
        .iter()
        .all(|change| change.reason() == ChangeReason::Update));
    // Matching items were derived a second time, with the old derived value
    // as the previous; the non-matching item is absent
    assert_eq!(
        sorted_triples(&set),
        vec![
            (
                "a".to_string(),
                "keep-a#2".to_string(),
                Some("keep-a#1".to_string()),
            ),
            (
                "b".to_string(),
                "keep-b#2".to_string(),
                Some("keep-b#1".to_string()),
            ),
        ]
    );
}

#[test]
fn test_predicate_receives_the_key() {
    let mut fixture = CommonTestFixture::counting();

    fixture
        .source
        .publish(TestPipelineFactory::adds(&[("k1", "x"), ("k2", "y")]))
        .expect("Failed to publish initial batch");
    let _ = fixture.recv_set();

    let predicate: RetransformPredicate<String, String> =
        Arc::new(|_source: &String, key: &String| key == "k1");
    fixture
        .retransform
        .publish(predicate)
        .expect("Failed to publish predicate");

    let set = fixture.recv_set();
    assert_eq!(
        sorted_pairs(&set),
        vec![("k1".to_string(), "x#2".to_string())]
    );
}

#[test]
fn test_retransform_skips_removed_keys() {
    let mut fixture = CommonTestFixture::counting();

    fixture
        .source
        .publish(TestPipelineFactory::adds(&[("a", "va"), ("b", "vb")]))
        .expect("Failed to publish adds");
    let _ = fixture.recv_set();

    fixture
        .source
        .publish(ChangeSet::from(vec![Change::remove(
            "a".to_string(),
            "va".to_string(),
            Some("va".to_string()),
        )]))
        .expect("Failed to publish remove");
    let _ = fixture.recv_set();

    let predicate: RetransformPredicate<String, String> =
        Arc::new(|_source: &String, _key: &String| true);
    fixture
        .retransform
        .publish(predicate)
        .expect("Failed to publish predicate");

    let set = fixture.recv_set();
    assert_eq!(
        sorted_pairs(&set),
        vec![("b".to_string(), "vb#2".to_string())]
    );
}

#[test]
fn test_retransform_on_empty_cache_emits_empty_set() {
    let mut fixture = CommonTestFixture::counting();

    let predicate: RetransformPredicate<String, String> =
        Arc::new(|_source: &String, _key: &String| true);
    fixture
        .retransform
        .publish(predicate)
        .expect("Failed to publish predicate");

    // Still one emission for the trigger, just with nothing in it
    let set = fixture.recv_set();
    assert!(set.is_empty());
}

#[test]
fn test_retransform_completion_keeps_source_flowing() {
    init_test_logging();
    let mut fixture = CommonTestFixture::uppercase();

    fixture
        .retransform
        .complete()
        .expect("Failed to complete the re-transform input");

    fixture
        .source
        .publish(TestPipelineFactory::adds(&[("k1", "alive")]))
        .expect("Failed to publish batch");

    let set = fixture.recv_set();
    assert_eq!(
        sorted_pairs(&set),
        vec![("k1".to_string(), "ALIVE".to_string())]
    );
}

#[test]
fn test_retransform_failure_fails_downstream() {
    let mut fixture = CommonTestFixture::uppercase();

    fixture
        .retransform
        .fail(Arc::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            "predicate source broke",
        )))
        .expect("Failed to fail the re-transform input");

    match fixture.recv_event() {
        StreamEvent::Failed(fault) => {
            assert!(fault.to_string().contains("predicate source broke"));
        }
        other => panic!("Expected downstream failure, got {:?}", other),
    }
}
