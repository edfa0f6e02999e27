//! The deferred-value primitive.
//!
//! A [`Promise`] owns a three-state machine and two ordered continuation
//! sequences:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        PROMISE LIFECYCLE                         │
//! │                                                                  │
//! │   Producer                                Consumer               │
//! │     │                                        │                   │
//! │     │── new(initializer) ─► SettleHandle     │                   │
//! │     │                          │             │── then(f) ──► p'  │
//! │     │                          │             │   (f queued)      │
//! │     │                          │                                 │
//! │     │                          │── fulfill(v) ─► drain queue:    │
//! │     │                          │   each entry defers f onto the  │
//! │     │                          │   task queue, FIFO              │
//! │     │                          │                                 │
//! │     │                          │── fulfill(w) ─► no-op           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Dispatch Timing
//!
//! A continuation never runs inside the `then` call that registered it,
//! nor inside the `fulfill`/`reject` call that selected it. Settlement and
//! registration only ever *schedule* continuations on the promise's
//! [`Schedule`]; the owner of the queue decides when they run. This holds
//! even when `then` is called on an already-settled instance.
//!
//! # Failure Conversion
//!
//! Continuations and initializers signal failure by returning `Err`; the
//! primitive converts that into rejection of the affected promise. No
//! failure escapes the primitive's methods as anything other than a
//! `Rejected` state.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use deferral::{Promise, TaskQueue};
//!
//! let queue = Arc::new(TaskQueue::new());
//! let chained = Promise::<i32, String>::fulfilled(queue.clone(), 2)
//!     .then(|n| Ok(n * 3))
//!     .then(|n| Ok(n + 1));
//!
//! queue.run_until_quiescent();
//! assert_eq!(chained.try_outcome(), Ok(Ok(7)));
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

use smallvec::SmallVec;

use crate::error::StillPending;
use crate::schedule::Schedule;
use crate::state::{Outcome, State};

/// Continuation wrapper queued while the promise is pending.
///
/// Invoked with a clone of the payload when settlement drains the queue;
/// its only job is to defer the user continuation onto the task queue.
type Waiter<P> = Box<dyn FnOnce(P) + Send + 'static>;

/// Shared state behind a promise and its settlement handles.
struct Inner<T, E> {
    state: State,
    /// Present exactly when `state == Fulfilled`.
    value: Option<T>,
    /// Present exactly when `state == Rejected`.
    reason: Option<E>,
    /// Drained in registration order on transition to `Fulfilled`.
    on_fulfilled: SmallVec<[Waiter<T>; 1]>,
    /// Drained in registration order on transition to `Rejected`.
    on_rejected: SmallVec<[Waiter<E>; 1]>,
}

impl<T, E> Inner<T, E> {
    fn pending() -> Self {
        Self {
            state: State::Pending,
            value: None,
            reason: None,
            on_fulfilled: SmallVec::new(),
            on_rejected: SmallVec::new(),
        }
    }
}

/// The eventual result of an asynchronous operation.
///
/// Cheap to clone; all clones observe the same settlement. `T` and `E`
/// must be `Clone` because one settled instance may dispatch its payload
/// to any number of registered continuations.
pub struct Promise<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
    schedule: Arc<dyn Schedule>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            schedule: Arc::clone(&self.schedule),
        }
    }
}

/// The settlement capability for one promise.
///
/// Handed to the initializer by [`Promise::new`]. Cloneable so a producer
/// can retain it beyond the initializer and settle from an external
/// trigger. All clones race for the same single settlement.
pub struct SettleHandle<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
}

impl<T, E> Clone for SettleHandle<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> SettleHandle<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Settles the promise as `Fulfilled` with `value`.
    ///
    /// Returns `true` if this call performed the settlement. Returns
    /// `false` if the promise was already settled: the call is a silent
    /// no-op, never an error.
    ///
    /// On success, every continuation queued for fulfillment is scheduled
    /// on the promise's task queue, in registration order, and both
    /// continuation sequences are permanently cleared.
    pub fn fulfill(&self, value: T) -> bool {
        let waiters = {
            let mut inner = self.inner.lock().expect("promise lock poisoned");
            if inner.state.is_terminal() {
                return false;
            }
            inner.state = State::Fulfilled;
            inner.value = Some(value.clone());
            inner.on_rejected.clear();
            std::mem::take(&mut inner.on_fulfilled)
        };
        for waiter in waiters {
            waiter(value.clone());
        }
        true
    }

    /// Settles the promise as `Rejected` with `reason`.
    ///
    /// Symmetric to [`fulfill`](Self::fulfill): settle-once, `false` on an
    /// already-settled promise, fulfillment continuations dropped.
    pub fn reject(&self, reason: E) -> bool {
        let waiters = {
            let mut inner = self.inner.lock().expect("promise lock poisoned");
            if inner.state.is_terminal() {
                return false;
            }
            inner.state = State::Rejected;
            inner.reason = Some(reason.clone());
            inner.on_fulfilled.clear();
            std::mem::take(&mut inner.on_rejected)
        };
        for waiter in waiters {
            waiter(reason.clone());
        }
        true
    }

    /// Settles from a continuation outcome: `Ok` fulfills, `Err` rejects.
    fn apply(&self, outcome: Result<T, E>) {
        match outcome {
            Ok(value) => {
                self.fulfill(value);
            }
            Err(reason) => {
                self.reject(reason);
            }
        }
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a pending promise and synchronously invokes `initializer`
    /// with its [`SettleHandle`] before returning.
    ///
    /// An `Err` returned by the initializer rejects the promise with that
    /// reason; construction itself never fails. If the initializer already
    /// settled the promise, a late `Err` is absorbed by settle-once.
    pub fn new<F>(schedule: Arc<dyn Schedule>, initializer: F) -> Self
    where
        F: FnOnce(SettleHandle<T, E>) -> Result<(), E>,
    {
        let promise = Self::with_schedule(schedule);
        let handle = promise.settle_handle();
        if let Err(reason) = initializer(handle.clone()) {
            handle.reject(reason);
        }
        promise
    }

    /// Creates a promise already settled as `Fulfilled` with `value`.
    ///
    /// Continuations registered afterwards still dispatch through the
    /// queue, never synchronously.
    pub fn fulfilled(schedule: Arc<dyn Schedule>, value: T) -> Self {
        Self::new(schedule, move |settle| {
            settle.fulfill(value);
            Ok(())
        })
    }

    /// Creates a promise already settled as `Rejected` with `reason`.
    pub fn rejected(schedule: Arc<dyn Schedule>, reason: E) -> Self {
        Self::new(schedule, move |settle| {
            settle.reject(reason);
            Ok(())
        })
    }

    fn with_schedule(schedule: Arc<dyn Schedule>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::pending())),
            schedule,
        }
    }

    fn settle_handle(&self) -> SettleHandle<T, E> {
        SettleHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Registers a fulfillment continuation; rejection passes through to
    /// the returned promise unchanged.
    ///
    /// The continuation's `Ok` becomes the downstream fulfillment value,
    /// its `Err` the downstream rejection reason. It is never invoked
    /// before `then` returns, even on an already-settled promise.
    pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
    {
        self.then_or_else(on_fulfilled, Err)
    }

    /// Registers a continuation pair and returns the downstream promise.
    ///
    /// Settlement selects exactly one of the two: `on_fulfilled` receives
    /// the value, `on_rejected` the reason. Whichever runs, its `Ok`
    /// fulfills the downstream promise and its `Err` rejects it, so a
    /// rejection arm returning `Ok` recovers the chain.
    pub fn then_or_else<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
        R: FnOnce(E) -> Result<U, E> + Send + 'static,
    {
        let downstream = Promise::with_schedule(Arc::clone(&self.schedule));
        let settle = downstream.settle_handle();

        let mut inner = self.inner.lock().expect("promise lock poisoned");
        match inner.state {
            State::Fulfilled => {
                let value = inner.value.clone().expect("fulfilled promise has a value");
                drop(inner);
                self.schedule.defer(Box::new(move || {
                    settle.apply(on_fulfilled(value));
                }));
            }
            State::Rejected => {
                let reason = inner.reason.clone().expect("rejected promise has a reason");
                drop(inner);
                self.schedule.defer(Box::new(move || {
                    settle.apply(on_rejected(reason));
                }));
            }
            State::Pending => {
                let fulfill_schedule = Arc::clone(&self.schedule);
                let fulfill_settle = settle.clone();
                inner.on_fulfilled.push(Box::new(move |value| {
                    fulfill_schedule.defer(Box::new(move || {
                        fulfill_settle.apply(on_fulfilled(value));
                    }));
                }));

                let reject_schedule = Arc::clone(&self.schedule);
                inner.on_rejected.push(Box::new(move |reason| {
                    reject_schedule.defer(Box::new(move || {
                        settle.apply(on_rejected(reason));
                    }));
                }));
            }
        }

        downstream
    }

    /// Registers a rejection continuation; fulfillment passes through to
    /// the returned promise unchanged.
    ///
    /// Sugar for [`then_or_else`](Self::then_or_else) with a
    /// pass-the-value-through fulfillment arm. An `on_rejected` returning
    /// `Ok` recovers: the downstream promise fulfills.
    pub fn catch<R>(&self, on_rejected: R) -> Self
    where
        R: FnOnce(E) -> Result<T, E> + Send + 'static,
    {
        self.then_or_else(Ok, on_rejected)
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> State {
        self.inner.lock().expect("promise lock poisoned").state
    }

    /// Returns true if the promise has left `Pending`.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state().is_terminal()
    }

    /// Reads the settled payload without blocking.
    ///
    /// Returns `Ok(Ok(value))` after fulfillment, `Ok(Err(reason))` after
    /// rejection, and `Err(StillPending)` while pending.
    pub fn try_outcome(&self) -> Result<Outcome<T, E>, StillPending> {
        let inner = self.inner.lock().expect("promise lock poisoned");
        match inner.state {
            State::Pending => Err(StillPending),
            State::Fulfilled => Ok(Ok(inner
                .value
                .clone()
                .expect("fulfilled promise has a value"))),
            State::Rejected => Ok(Err(inner
                .reason
                .clone()
                .expect("rejected promise has a reason"))),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().expect("promise lock poisoned");
        f.debug_struct("Promise")
            .field("state", &inner.state)
            .field("queued_fulfill", &inner.on_fulfilled.len())
            .field("queued_reject", &inner.on_rejected.len())
            .finish()
    }
}

impl<T, E> fmt::Debug for SettleHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().expect("promise lock poisoned");
        f.debug_struct("SettleHandle")
            .field("state", &inner.state)
            .finish()
    }
}
