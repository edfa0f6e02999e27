//! State machine types for a deferred value.
//!
//! ```text
//! ┌─────────┐  fulfill(value)   ┌───────────┐
//! │ Pending │ ────────────────► │ Fulfilled │ (terminal)
//! │         │                   └───────────┘
//! │         │  reject(reason)   ┌───────────┐
//! │         │ ────────────────► │ Rejected  │ (terminal)
//! └─────────┘                   └───────────┘
//! ```
//!
//! The state is monotonic: once an instance leaves `Pending` it never
//! changes again.

use std::fmt;

/// The lifecycle state of a [`Promise`](crate::Promise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Not yet settled; continuations queue until a transition occurs.
    Pending,
    /// Settled with a value. Terminal.
    Fulfilled,
    /// Settled with a reason. Terminal.
    Rejected,
}

impl State {
    /// Returns true if no further transition is possible from this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns a human-readable name for the state.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A settled payload as observed through inspection APIs: `Ok` carries the
/// fulfillment value, `Err` carries the rejection reason.
pub type Outcome<T, E> = Result<T, E>;
