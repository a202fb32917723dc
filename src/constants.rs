//! Centralized timing and sizing constants.
//!
//! This module consolidates the tunables of the operation queue. Having them
//! in one place makes it easier to:
//!
//! - Understand the backpressure behavior at a glance
//! - Document the rationale for each value
//! - Keep tests and production on the same numbers

use std::time::Duration;

/// Maximum time a producer waits to hand an operation to the apply worker.
///
/// The deadline covers only the handoff phase: once the worker has taken the
/// operation, the caller is committed to hearing the outcome and no further
/// timeout applies. When the deadline fires first, `enqueue` returns
/// [`Error::DeadlineExceeded`](crate::error::Error::DeadlineExceeded) and the
/// operation is guaranteed never to reach the worker.
///
/// This is deliberately a queue-level constant rather than a per-call or
/// constructor parameter: every caller shares the same backpressure bound, so
/// an overloaded node sheds load uniformly instead of letting patient callers
/// outwait impatient ones.
pub const ENQUEUE_TIMEOUT: Duration = Duration::from_secs(1);

/// Channel depth of the operation handoff.
///
/// A single slot keeps "at most one operation in flight" a structural
/// property of the queue. The slot may briefly hold an operation whose
/// producer gave up at the deadline; such operations are filtered out inside
/// [`OpConsumer::recv`](crate::queue::OpConsumer::recv) and are never visible
/// to the apply worker.
pub const OP_QUEUE_DEPTH: usize = 1;
