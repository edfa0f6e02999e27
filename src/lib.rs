//! Deferral: a deferred-value (promise) primitive with deterministic
//! continuation scheduling.
//!
//! # Overview
//!
//! A [`Promise`] represents the eventual result of an asynchronous
//! operation. It is a three-state machine (`Pending`, `Fulfilled`,
//! `Rejected`) that settles at most once, holds ordered lists of
//! continuations while pending, and dispatches every continuation through
//! a deferred-execution queue so that no caller ever observes a
//! continuation running inside `then` or inside a settlement call.
//!
//! # Core Guarantees
//!
//! - **Settle-once**: only the first settlement attempt on an instance has
//!   any effect; later attempts are silent no-ops, never errors
//! - **FIFO dispatch**: continuations registered against one instance run
//!   in registration order when settlement drains them
//! - **Deferred-not-synchronous**: a continuation never runs before the
//!   `then` call (or the settlement call) that triggered it returns to its
//!   caller
//! - **Failures become rejections**: an initializer or continuation that
//!   fails settles the affected promise as `Rejected`; no error escapes
//!   the primitive's own methods
//!
//! # Module Structure
//!
//! - [`state`]: The `Pending`/`Fulfilled`/`Rejected` state machine types
//! - [`promise`]: The [`Promise`] primitive and its [`SettleHandle`]
//!   settlement capability
//! - [`schedule`]: The [`Schedule`] seam and the [`TaskQueue`] FIFO driver
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use deferral::{Promise, TaskQueue};
//!
//! let queue = Arc::new(TaskQueue::new());
//! let doubled = Promise::<i32, String>::fulfilled(queue.clone(), 21)
//!     .then(|n| Ok(n * 2));
//!
//! queue.run_until_quiescent();
//! assert_eq!(doubled.try_outcome(), Ok(Ok(42)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod promise;
pub mod schedule;
pub mod state;

pub use error::StillPending;
pub use promise::{Promise, SettleHandle};
pub use schedule::{QueueConfig, QueueMetrics, Schedule, Task, TaskQueue};
pub use state::{Outcome, State};
