//! Client API Test Suite
//!
//! End-to-end tests of the asynchronous client against the in-memory driver:
//! submission, completion routing, the event pump, fatal handling and
//! continuations that submit further requests.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test client_api
//!
//! # Run pump tests only
//! cargo test --test client_api pump::
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use dockv::dockv_client::backend::memory::{MemoryBackend, MemoryBucket, MemoryCluster};
use dockv::prelude::*;

pub mod get;
pub mod put;
pub mod reentrancy;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// A client connected to a private cluster
pub struct Harness {
    pub cluster: Arc<MemoryCluster>,
    pub client: DbClient,
}

impl Harness {
    /// The bucket the client is connected to
    pub fn bucket(&self) -> Arc<MemoryBucket> {
        self.cluster
            .bucket(&self.client.bucket())
            .expect("connected bucket exists")
    }

    /// A second client on the same cluster and bucket
    pub fn second_client(&self) -> DbClient {
        let backend = Box::new(MemoryBackend::new(Arc::clone(&self.cluster)));
        DbClient::with_backend(&ClientConfig::default(), backend).expect("second client connects")
    }
}

/// Client with immediate responses
pub fn harness() -> Harness {
    harness_with_latency(Duration::ZERO)
}

/// Client whose responses arrive after `latency`
pub fn harness_with_latency(latency: Duration) -> Harness {
    let cluster = Arc::new(MemoryCluster::new());
    let backend = Box::new(MemoryBackend::new(Arc::clone(&cluster)).with_latency(latency));
    let client =
        DbClient::with_backend(&ClientConfig::default(), backend).expect("client connects");
    Harness { cluster, client }
}

/// Ordered record of callback invocations
pub type Log = Rc<RefCell<Vec<String>>>;

/// Callback appending `label` to `log`
pub fn record(log: &Log, label: &str) -> impl FnOnce() + 'static {
    let log = Rc::clone(log);
    let label = label.to_string();
    move || log.borrow_mut().push(label)
}

/// Boxed variant of [`record`] for `on_conflict` arguments
pub fn record_boxed(log: &Log, label: &str) -> Option<dockv::dockv_client::Callback> {
    Some(Box::new(record(log, label)))
}

/// Slot receiving every value a get delivers
pub type Received = Rc<RefCell<Vec<Value>>>;

/// Callback pushing the delivered value into `slot`
pub fn receive(slot: &Received) -> impl FnOnce(Value) + 'static {
    let slot = Rc::clone(slot);
    move |value| slot.borrow_mut().push(value)
}

/// Store `document` under `key` and drain, panicking on anything but success
pub fn store(client: &DbClient, key: &str, document: impl Into<Value>) {
    let log = Log::default();
    client
        .put(key, document, record(&log, "done"), record_boxed(&log, "conflict"), StorePolicy::SetUnconditionally)
        .unwrap();
    client.process(Duration::ZERO).unwrap();
    assert_eq!(*log.borrow(), vec!["done"], "store of {:?} failed", key);
}

/// Fetch `key` and drain, returning the delivered value
pub fn fetch(client: &DbClient, key: &str) -> Value {
    let received = Received::default();
    client.get(key, receive(&received)).unwrap();
    client.process(Duration::ZERO).unwrap();
    let mut values = received.borrow_mut();
    assert_eq!(values.len(), 1, "get of {:?} delivered {} values", key, values.len());
    values.remove(0)
}

/// Standard test values covering common types
pub fn standard_test_values() -> Vec<(&'static str, Value)> {
    vec![
        ("null", Value::Null),
        ("bool_true", Value::Bool(true)),
        ("bool_false", Value::Bool(false)),
        ("int_pos", Value::Int(42)),
        ("int_neg", Value::Int(-42)),
        ("int_zero", Value::Int(0)),
        ("float_pos", Value::Float(3.14159)),
        ("float_neg", Value::Float(-2.71828)),
        ("float_inf", Value::Float(f64::INFINITY)),
        ("string", Value::String("hello world".into())),
        ("string_unicode", Value::String("日本語 🌍".into())),
        ("string_empty", Value::String("".into())),
        ("bytes", Value::Bytes(vec![0x00, 0x01, 0xFF, 0xFE])),
        ("bytes_empty", Value::Bytes(vec![])),
        (
            "array",
            Value::Array(vec![Value::Int(1), Value::String("two".into())]),
        ),
        ("object", {
            let mut m = BTreeMap::new();
            m.insert("nested".to_string(), Value::Int(123));
            m.insert("list".to_string(), Value::Array(vec![Value::Null]));
            Value::Object(m)
        }),
    ]
}
