//! Error types for the deferral crate.
//!
//! The primitive itself never surfaces failures as errors: initializer and
//! continuation failures become rejections, and settling an already-settled
//! promise is a silent no-op. The only error here belongs to the
//! non-blocking inspection surface.

use thiserror::Error;

/// Error returned when reading the outcome of a promise that has not
/// settled yet.
///
/// This is not a failure of the primitive; the read simply raced ahead of
/// settlement and can be retried after the driving queue has been pumped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("promise is still pending")]
pub struct StillPending;
