//! Put routing tests
//!
//! Exactly one of `on_done` / `on_conflict` fires per put, and write policies
//! are honoured by the store.

use crate::*;

// =============================================================================
// SET
// =============================================================================

#[test]
fn test_put_abc_54_fires_on_done_once() {
    let h = harness();
    let log = Log::default();

    h.client
        .put("abc", 54, record(&log, "done"), record_boxed(&log, "conflict"), StorePolicy::SetUnconditionally)
        .unwrap();
    h.client.process(Duration::ZERO).unwrap();

    assert_eq!(*log.borrow(), vec!["done"]);
    assert_eq!(h.bucket().get_raw("abc"), Some(b"54".to_vec()));
}

#[test]
fn test_set_then_get_all_value_types() {
    let h = harness();

    for (name, value) in standard_test_values() {
        let key = format!("type:{}", name);
        store(&h.client, &key, value.clone());
        assert_eq!(fetch(&h.client, &key), value, "Failed for type: {}", name);
    }
}

#[test]
fn test_set_overwrites_existing() {
    let h = harness();
    store(&h.client, "key", 1);
    store(&h.client, "key", 2);
    assert_eq!(fetch(&h.client, "key"), Value::Int(2));
}

// =============================================================================
// ADD
// =============================================================================

#[test]
fn test_add_on_existing_key_fires_on_conflict() {
    let h = harness();
    store(&h.client, "abc", "original");

    let log = Log::default();
    h.client
        .put("abc", "replacement", record(&log, "done"), record_boxed(&log, "conflict"), StorePolicy::AddIfAbsent)
        .unwrap();
    h.client.process(Duration::ZERO).unwrap();

    assert_eq!(*log.borrow(), vec!["conflict"]);
    assert_eq!(fetch(&h.client, "abc"), Value::from("original"));
}

#[test]
fn test_add_on_missing_key_stores() {
    let h = harness();
    let log = Log::default();
    h.client
        .put("fresh", true, record(&log, "done"), record_boxed(&log, "conflict"), StorePolicy::AddIfAbsent)
        .unwrap();
    h.client.process(Duration::ZERO).unwrap();

    assert_eq!(*log.borrow(), vec!["done"]);
    assert_eq!(fetch(&h.client, "fresh"), Value::Bool(true));
}

#[test]
fn test_add_conflict_without_on_conflict_is_silent() {
    let h = harness();
    store(&h.client, "abc", 1);

    let log = Log::default();
    h.client
        .put("abc", 2, record(&log, "done"), None, StorePolicy::AddIfAbsent)
        .unwrap();
    let report = h.client.process(Duration::ZERO).unwrap();

    assert!(log.borrow().is_empty());
    assert_eq!(report.completed, 1);
    assert_eq!(h.client.outstanding(), 0);
}

// =============================================================================
// REPLACE
// =============================================================================

#[test]
fn test_replace_on_missing_key_fires_on_conflict() {
    let h = harness();
    let log = Log::default();
    h.client
        .put("ghost", 1, record(&log, "done"), record_boxed(&log, "conflict"), StorePolicy::ReplaceIfPresent)
        .unwrap();
    h.client.process(Duration::ZERO).unwrap();

    assert_eq!(*log.borrow(), vec!["conflict"]);
    assert!(!h.bucket().contains_key("ghost"));
    assert_eq!(fetch(&h.client, "ghost"), Value::Null);
}

#[test]
fn test_replace_on_existing_key_stores() {
    let h = harness();
    store(&h.client, "abc", 1);

    let log = Log::default();
    h.client
        .put("abc", 2, record(&log, "done"), record_boxed(&log, "conflict"), StorePolicy::ReplaceIfPresent)
        .unwrap();
    h.client.process(Duration::ZERO).unwrap();

    assert_eq!(*log.borrow(), vec!["done"]);
    assert_eq!(fetch(&h.client, "abc"), Value::Int(2));
}

// =============================================================================
// BUILDER AND VALIDATION
// =============================================================================

#[test]
fn test_submit_put_builder() {
    let h = harness();
    let log = Log::default();
    let op = PutOperation::new("built", vec![Value::Int(1), Value::Int(2)])
        .policy(StorePolicy::AddIfAbsent)
        .on_done(record(&log, "done"))
        .on_conflict(record(&log, "conflict"));
    h.client.submit_put(op).unwrap();
    h.client.process(Duration::ZERO).unwrap();

    assert_eq!(*log.borrow(), vec!["done"]);
    assert_eq!(
        fetch(&h.client, "built"),
        Value::Array(vec![Value::Int(1), Value::Int(2)])
    );
}

#[test]
fn test_invalid_keys_fail_synchronously() {
    let h = harness();
    let long = "k".repeat(251);

    for key in ["", long.as_str()] {
        let err = h
            .client
            .put(key, 1, || {}, None, StorePolicy::SetUnconditionally)
            .unwrap_err();
        assert!(err.is_invalid_input(), "{:?}", err);
    }
    assert_eq!(h.client.outstanding(), 0);
    assert_eq!(h.client.state(), PumpState::Idle);
}

#[test]
fn test_key_at_limit_is_accepted() {
    let h = harness();
    let key = "k".repeat(250);
    store(&h.client, &key, 7);
    assert_eq!(fetch(&h.client, &key), Value::Int(7));
}

// =============================================================================
// DOCUMENT DEPTH
// =============================================================================

fn nested(depth: usize) -> Value {
    let mut value = Value::Int(1);
    for _ in 0..depth {
        value = Value::Array(vec![value]);
    }
    value
}

#[test]
fn test_deepest_allowed_document_round_trips() {
    let h = harness();
    let document = nested(dockv::dockv_wire::MAX_DOCUMENT_DEPTH);
    store(&h.client, "deep", document.clone());
    assert_eq!(fetch(&h.client, "deep"), document);
}

#[test]
fn test_too_deep_document_fails_synchronously() {
    let h = harness();
    let err = h
        .client
        .put(
            "deep",
            nested(dockv::dockv_wire::MAX_DOCUMENT_DEPTH + 1),
            || panic!("must not be stored"),
            None,
            StorePolicy::SetUnconditionally,
        )
        .unwrap_err();
    assert!(err.is_invalid_input(), "{:?}", err);
    assert!(matches!(err, dockv::Error::InvalidDocument { .. }));
    assert_eq!(h.client.outstanding(), 0);
    assert_eq!(fetch(&h.client, "deep"), Value::Null);
}
