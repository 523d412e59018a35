//! Get routing tests
//!
//! Covers read misses, decoding of stored documents and get-and-lock.

use crate::*;
use dockv::BackendStatus;
use proptest::prelude::*;

#[test]
fn test_get_never_stored_yields_null_once() {
    let h = harness();
    let received = Received::default();

    h.client.get("abc", receive(&received)).unwrap();
    h.client.process(Duration::ZERO).unwrap();

    assert_eq!(*received.borrow(), vec![Value::Null]);

    // a second drain must not deliver again
    h.client.process(Duration::ZERO).unwrap();
    assert_eq!(received.borrow().len(), 1);
}

#[test]
fn test_get_decodes_stored_json() {
    let h = harness();
    h.bucket().insert_raw("profile", r#"{"name":"Alice","level":7}"#);

    let value = fetch(&h.client, "profile");
    assert_eq!(value.get("name"), Some(&Value::from("Alice")));
    assert_eq!(value.get("level"), Some(&Value::Int(7)));
}

#[test]
fn test_get_returns_value_stored_by_another_client() {
    let h = harness();
    let other = h.second_client();
    store(&other, "shared", "hello");
    assert_eq!(fetch(&h.client, "shared"), Value::from("hello"));
}

#[test]
fn test_submit_get_builder() {
    let h = harness();
    store(&h.client, "abc", 1);

    let received = Received::default();
    h.client
        .submit_get(GetOperation::new("abc", receive(&received)))
        .unwrap();
    h.client.process(Duration::ZERO).unwrap();
    assert_eq!(*received.borrow(), vec![Value::Int(1)]);
}

// =============================================================================
// GET AND LOCK
// =============================================================================

#[test]
fn test_get_and_lock_locks_key() {
    let h = harness();
    store(&h.client, "abc", 1);

    let received = Received::default();
    h.client.get_and_lock("abc", 15, receive(&received)).unwrap();
    h.client.process(Duration::ZERO).unwrap();

    assert_eq!(*received.borrow(), vec![Value::Int(1)]);
    assert!(h.bucket().is_locked("abc"));
}

#[test]
fn test_lock_zero_does_not_lock() {
    let h = harness();
    store(&h.client, "abc", 1);

    let received = Received::default();
    h.client.get_and_lock("abc", 0, receive(&received)).unwrap();
    h.client.process(Duration::ZERO).unwrap();

    assert_eq!(received.borrow().len(), 1);
    assert!(!h.bucket().is_locked("abc"));
}

#[test]
fn test_locked_key_rejects_other_session_store() {
    let h = harness();
    store(&h.client, "abc", 1);
    h.client.get_and_lock("abc", 15, |_| {}).unwrap();
    h.client.process(Duration::ZERO).unwrap();

    let other = h.second_client();
    let log = Log::default();
    other
        .put("abc", 2, record(&log, "done"), record_boxed(&log, "conflict"), StorePolicy::SetUnconditionally)
        .unwrap();
    other.process(Duration::ZERO).unwrap();
    assert_eq!(*log.borrow(), vec!["conflict"]);

    // the lock holder may still write, which releases the lock
    store(&h.client, "abc", 3);
    assert!(!h.bucket().is_locked("abc"));
    assert_eq!(fetch(&other, "abc"), Value::Int(3));
}

#[test]
fn test_second_lock_attempt_is_fatal() {
    let h = harness();
    store(&h.client, "abc", 1);
    h.client.get_and_lock("abc", 15, |_| {}).unwrap();
    h.client.process(Duration::ZERO).unwrap();

    let received = Received::default();
    h.client.get_and_lock("abc", 15, receive(&received)).unwrap();
    let err = h.client.process(Duration::ZERO).unwrap_err();

    assert_eq!(
        err.as_fatal().and_then(|f| f.status()),
        Some(BackendStatus::Locked)
    );
    assert!(received.borrow().is_empty());
}

#[test]
fn test_user_objects_shaped_like_wrappers_read_back_unchanged() {
    let h = harness();
    let mut fields = BTreeMap::new();
    fields.insert("$bytes".to_string(), Value::String("aGk=".into()));
    let looks_like_bytes = Value::Object(fields);
    let mut fields = BTreeMap::new();
    fields.insert("$f64".to_string(), Value::String("NaN".into()));
    fields.insert("$$f64".to_string(), Value::Int(1));
    let looks_like_float = Value::Object(fields);

    store(&h.client, "bytes", looks_like_bytes.clone());
    store(&h.client, "float", looks_like_float.clone());
    assert_eq!(fetch(&h.client, "bytes"), looks_like_bytes);
    assert_eq!(fetch(&h.client, "float"), looks_like_float);
}

// =============================================================================
// ROUND TRIP PROPERTY
// =============================================================================

fn arb_document() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>()
            .prop_filter("not NaN", |f| !f.is_nan())
            .prop_map(Value::Float),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
        proptest::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ];
    leaf.prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[$a-z]{1,6}", inner, 0..4).prop_map(Value::Object),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_set_then_get_round_trips(key in "[a-z:]{1,32}", document in arb_document()) {
        let h = harness();
        store(&h.client, &key, document.clone());
        prop_assert_eq!(fetch(&h.client, &key), document);
    }
}
