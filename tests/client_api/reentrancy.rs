//! Continuations that call back into the client
//!
//! A continuation may submit new requests. They reach the backend at once
//! but are only waited on by the next drain.

use std::cell::Cell;

use crate::*;
use dockv::Error;

#[test]
fn test_callback_submission_waits_for_next_drain() {
    let h = harness();
    let log = Log::default();

    let client = h.client.handle();
    let inner_log = Rc::clone(&log);
    h.client
        .get("abc", move |value| {
            assert!(value.is_null());
            inner_log.borrow_mut().push("get".into());
            client
                .put("abc", 54, record(&inner_log, "put"), None, StorePolicy::AddIfAbsent)
                .unwrap();
        })
        .unwrap();

    let report = h.client.process(Duration::ZERO).unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(report.outstanding, 1);
    assert_eq!(*log.borrow(), vec!["get"]);

    let report = h.client.process(Duration::ZERO).unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(*log.borrow(), vec!["get", "put"]);
    assert_eq!(fetch(&h.client, "abc"), Value::Int(54));
}

#[test]
fn test_callback_submission_is_sent_immediately() {
    let h = harness_with_latency(Duration::from_millis(20));
    let client = h.client.handle();
    h.client
        .get("first", move |_| {
            client
                .put("second", 2, || {}, None, StorePolicy::SetUnconditionally)
                .unwrap();
        })
        .unwrap();

    h.client.process(Duration::ZERO).unwrap();
    // the follow-up was handed to the driver inside the callback, so its
    // latency has been running since then
    std::thread::sleep(Duration::from_millis(25));
    let report = h.client.process(Duration::from_millis(5)).unwrap();
    assert_eq!(report.completed, 1);
    assert!(!report.timed_out);
}

#[test]
fn test_chain_of_followups_drained_by_wait() {
    let h = harness();
    let hops = Rc::new(Cell::new(0));

    fn hop(client: ClientHandle, hops: Rc<Cell<u32>>) {
        let next = client.clone();
        client
            .get("chain", move |_| {
                hops.set(hops.get() + 1);
                if hops.get() < 5 {
                    hop(next, hops);
                }
            })
            .unwrap();
    }
    hop(h.client.handle(), Rc::clone(&hops));

    let report = h.client.wait().unwrap();
    assert_eq!(hops.get(), 5);
    assert_eq!(report.completed, 5);
    assert!(report.is_idle());
}

#[test]
fn test_same_key_resubmitted_from_callback() {
    let h = harness();
    store(&h.client, "counter", 1);

    let client = h.client.handle();
    h.client
        .get("counter", move |value| {
            let next = value.as_int().unwrap_or(0) + 1;
            client
                .put("counter", next, || {}, None, StorePolicy::ReplaceIfPresent)
                .unwrap();
        })
        .unwrap();
    h.client.wait().unwrap();

    assert_eq!(fetch(&h.client, "counter"), Value::Int(2));
}

#[test]
fn test_nested_process_is_rejected() {
    let h = harness();
    let nested = Rc::new(RefCell::new(None));

    let client = h.client.handle();
    let slot = Rc::clone(&nested);
    h.client
        .get("abc", move |_| {
            *slot.borrow_mut() = Some(client.process(Duration::ZERO));
        })
        .unwrap();
    h.client.process(Duration::ZERO).unwrap();

    let nested = nested.borrow_mut().take().unwrap();
    assert!(matches!(nested, Err(Error::Reentrant)));
    assert_eq!(h.client.state(), PumpState::Idle);
}

#[test]
fn test_state_is_draining_inside_callback() {
    let h = harness();
    let observed = Rc::new(Cell::new(PumpState::Idle));

    let client = h.client.handle();
    let slot = Rc::clone(&observed);
    h.client
        .get("abc", move |_| slot.set(client.state()))
        .unwrap();
    h.client.process(Duration::ZERO).unwrap();

    assert_eq!(observed.get(), PumpState::Draining);
    assert_eq!(h.client.state(), PumpState::Idle);
}

#[test]
fn test_panicking_callback_leaves_client_usable() {
    let h = harness();
    h.client
        .get("abc", |_| panic!("callback failed"))
        .unwrap();

    let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        h.client.process(Duration::ZERO)
    }));
    assert!(unwound.is_err());
    assert_eq!(h.client.state(), PumpState::Idle);

    store(&h.client, "abc", 7);
    assert_eq!(fetch(&h.client, "abc"), Value::Int(7));
}

#[test]
fn test_dropping_client_with_handle_in_pending_callback() {
    let h = harness();
    let handle = h.client.handle();
    let follow_up = handle.clone();
    h.client
        .get("abc", move |_| {
            let _ = follow_up.get("abc", |_| {});
        })
        .unwrap();

    let Harness { cluster, client } = h;
    drop(client);
    assert!(handle.is_closed());
    assert!(matches!(handle.get("abc", |_| {}), Err(Error::Closed)));
    drop(cluster);
}
