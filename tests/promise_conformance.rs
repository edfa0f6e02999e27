//! Conformance suite for the promise primitive's public contract.
//!
//! Covers the observable properties every consumer of the primitive relies
//! on: settle-once, registration-order dispatch, deferred-not-synchronous
//! continuation execution, and chaining composition (including failure
//! conversion and recovery).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use deferral::{Promise, SettleHandle, State, StillPending, TaskQueue};

fn queue() -> Arc<TaskQueue> {
    Arc::new(TaskQueue::new())
}

/// Builds a pending promise and hands back the settlement handle its
/// initializer captured, the way an externally-triggered producer would.
fn pending_with_handle(queue: &Arc<TaskQueue>) -> (Promise<i32, String>, SettleHandle<i32, String>) {
    let slot = Arc::new(Mutex::new(None));
    let capture = Arc::clone(&slot);
    let promise = Promise::new(queue.clone(), move |settle| {
        *capture.lock().expect("slot lock") = Some(settle);
        Ok(())
    });
    let handle = slot
        .lock()
        .expect("slot lock")
        .take()
        .expect("initializer ran synchronously");
    (promise, handle)
}

#[test]
fn settle_once_across_mixed_sequences() {
    let queue = queue();

    let (fulfilled_first, handle) = pending_with_handle(&queue);
    assert!(handle.fulfill(1));
    assert!(!handle.reject("late".into()));
    assert!(!handle.fulfill(2));
    assert_eq!(fulfilled_first.try_outcome(), Ok(Ok(1)));

    let (rejected_first, handle) = pending_with_handle(&queue);
    assert!(handle.reject("first".into()));
    assert!(!handle.fulfill(3));
    assert!(!handle.reject("second".into()));
    assert_eq!(rejected_first.try_outcome(), Ok(Err("first".into())));
}

#[test]
fn settle_once_holds_across_handle_clones() {
    let queue = queue();
    let (promise, handle) = pending_with_handle(&queue);
    let alias = handle.clone();

    assert!(handle.fulfill(10));
    assert!(!alias.fulfill(20));
    assert!(!alias.reject("nope".into()));

    assert_eq!(promise.try_outcome(), Ok(Ok(10)));
}

#[test]
fn continuations_dispatch_in_registration_order() {
    let queue = queue();
    let (promise, handle) = pending_with_handle(&queue);
    let order = Arc::new(Mutex::new(Vec::new()));

    for label in ["c1", "c2", "c3"] {
        let order = Arc::clone(&order);
        drop(promise.then(move |n| {
            order.lock().expect("order lock").push(label);
            Ok(n)
        }));
    }

    handle.fulfill(0);
    queue.run_until_quiescent();

    assert_eq!(*order.lock().expect("order lock"), vec!["c1", "c2", "c3"]);
}

#[test]
fn then_on_fulfilled_promise_is_not_synchronous() {
    let queue = queue();
    let promise = Promise::<i32, String>::fulfilled(queue.clone(), 1);

    let marker = Arc::new(AtomicBool::new(false));
    let set_marker = Arc::clone(&marker);
    let chained = promise.then(move |n| {
        set_marker.store(true, Ordering::SeqCst);
        Ok(n)
    });

    // The marker must not reflect the continuation's effect yet.
    assert!(!marker.load(Ordering::SeqCst));
    assert_eq!(chained.try_outcome(), Err(StillPending));

    queue.run_until_quiescent();
    assert!(marker.load(Ordering::SeqCst));
    assert_eq!(chained.try_outcome(), Ok(Ok(1)));
}

#[test]
fn chaining_applies_transformations_in_sequence() {
    let queue = queue();
    let chained = Promise::<i32, String>::fulfilled(queue.clone(), 2)
        .then(|n| Ok(n * 3))
        .then(|n| Ok(n + 1));

    queue.run_until_quiescent();
    assert_eq!(chained.try_outcome(), Ok(Ok(7)));
}

#[test]
fn failed_continuation_is_recovered_by_catch() {
    let queue = queue();
    let recovered = Promise::<i32, String>::fulfilled(queue.clone(), 1)
        .then(|_n| Err::<String, _>("boom".into()))
        .catch(Ok);

    queue.run_until_quiescent();
    assert_eq!(recovered.try_outcome(), Ok(Ok("boom".into())));
}

#[test]
fn rejection_passes_through_a_fulfillment_only_then() {
    let queue = queue();
    let chained = Promise::<i32, String>::rejected(queue.clone(), "err".into()).then(Ok);

    queue.run_until_quiescent();
    assert_eq!(chained.try_outcome(), Ok(Err("err".into())));
    assert_eq!(chained.state(), State::Rejected);
}

#[test]
fn pending_then_settle_yields_transformed_value() {
    let queue = queue();
    let (promise, handle) = pending_with_handle(&queue);

    // Register before the external trigger fires.
    let chained = promise.then(|n| Ok(n * 10));
    queue.run_until_quiescent();
    assert_eq!(chained.try_outcome(), Err(StillPending));

    handle.fulfill(7);
    queue.run_until_quiescent();
    assert_eq!(chained.try_outcome(), Ok(Ok(70)));
}

#[test]
fn chain_settles_only_after_upstream_continuation_ran() {
    let queue = queue();
    let (promise, handle) = pending_with_handle(&queue);
    let order = Arc::new(Mutex::new(Vec::new()));

    let first_order = Arc::clone(&order);
    let second_order = Arc::clone(&order);
    let chained = promise
        .then(move |n| {
            first_order.lock().expect("order lock").push("f1");
            Ok(n + 1)
        })
        .then(move |n| {
            second_order.lock().expect("order lock").push("f2");
            Ok(n + 1)
        });

    handle.fulfill(0);
    queue.run_until_quiescent();

    assert_eq!(*order.lock().expect("order lock"), vec!["f1", "f2"]);
    assert_eq!(chained.try_outcome(), Ok(Ok(2)));
}

#[test]
fn rejection_selects_only_the_rejection_arm() {
    let queue = queue();
    let (promise, handle) = pending_with_handle(&queue);

    let fulfilled_ran = Arc::new(AtomicBool::new(false));
    let mark = Arc::clone(&fulfilled_ran);
    let chained = promise.then_or_else(
        move |n| {
            mark.store(true, Ordering::SeqCst);
            Ok(n)
        },
        |reason| Err(format!("handled: {reason}")),
    );

    handle.reject("down".into());
    queue.run_until_quiescent();

    assert!(!fulfilled_ran.load(Ordering::SeqCst));
    assert_eq!(chained.try_outcome(), Ok(Err("handled: down".into())));
}

#[test]
fn registration_after_settlement_still_dispatches_deferred() {
    let queue = queue();
    let (promise, handle) = pending_with_handle(&queue);
    handle.fulfill(5);
    queue.run_until_quiescent();

    // Late registration queues fresh work instead of running inline.
    let chained = promise.then(|n| Ok(n + 1));
    assert_eq!(chained.try_outcome(), Err(StillPending));

    queue.run_until_quiescent();
    assert_eq!(chained.try_outcome(), Ok(Ok(6)));
}
