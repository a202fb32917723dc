//! Crate level errors and classification predicates.
//!
//! The crate uses a two-layer error hierarchy:
//!
//! ## Public layer (`crate::error`)
//!
//! - [`Error`]: what [`enqueue`](crate::queue::OpQueue::enqueue) and
//!   [`apply_lease`](crate::mediator::RaftMediator::apply_lease) return to
//!   callers. Three classes matter to clients:
//!   - [`Error::DeadlineExceeded`] — backpressure; the operation never
//!     reached the apply worker and the caller decides whether to retry,
//!     drop, or shed load. Never retried internally.
//!   - [`Error::NotLeader`] — this node cannot accept writes; the redirect
//!     coordinates are carried unchanged so the API layer can point the
//!     client at the leader without another round trip.
//!   - [`Error::Apply`] — any other apply-time failure, propagated verbatim.
//!
//! ## Worker layer (`crate::applier`)
//!
//! - [`NotLeaderError`](crate::applier::NotLeaderError): the refusal the
//!   apply worker reports. The mediator lifts it across the boundary into
//!   [`Error::NotLeader`], preserving the coordinates bit-exact.
//!
//! ## Classification
//!
//! Annotations added upstream must not defeat recognition, so the predicates
//! here inspect the whole cause chain rather than the top-level value alone.
//! [`is_deadline_exceeded`] is the only supported way to detect the
//! backpressure class externally.

use std::result;

use thiserror::Error as ThisError;

use crate::applier::NotLeaderError;

pub type Result<T> = result::Result<T, Error>;

/// Errors surfaced by the operation queue and the lease mediator.
#[derive(Debug, ThisError)]
pub enum Error {
    /// A producer waited longer than
    /// [`ENQUEUE_TIMEOUT`](crate::constants::ENQUEUE_TIMEOUT) to hand its
    /// operation to the apply worker. The worker has not seen and will never
    /// see the operation.
    #[error("enqueueing deadline exceeded")]
    DeadlineExceeded,

    /// This node is not the raft leader; writes must be redirected to the
    /// given address and server id.
    #[error("not the raft leader, redirect to {server_address} (server {server_id})")]
    NotLeader {
        /// Network address of the current leader.
        server_address: String,
        /// Raft server id of the current leader.
        server_id: String,
    },

    /// One half of the queue has been dropped: the consumer is gone, or the
    /// worker discarded an operation without replying.
    #[error("operation queue closed")]
    QueueClosed,

    /// Apply-time failure reported by the worker, propagated verbatim.
    #[error("{0}")]
    Apply(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Wrap an apply-time failure for transport through the queue.
    pub fn apply<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Apply(Box::new(err))
    }

    /// Check whether this error is the backpressure signal, directly or
    /// anywhere in its cause chain.
    #[inline]
    pub fn is_deadline_exceeded(&self) -> bool {
        is_deadline_exceeded(self)
    }

    /// Check whether this error is a leadership refusal.
    #[inline]
    pub fn is_not_leader(&self) -> bool {
        self.not_leader().is_some()
    }

    /// If this error (or anything in its cause chain) refuses the write for
    /// lack of leadership, return the `(server_address, server_id)` redirect
    /// coordinates.
    pub fn not_leader(&self) -> Option<(&str, &str)> {
        for err in chain(self) {
            if let Some(Error::NotLeader {
                server_address,
                server_id,
            }) = err.downcast_ref::<Error>()
            {
                return Some((server_address.as_str(), server_id.as_str()));
            }
            if let Some(refusal) = err.downcast_ref::<NotLeaderError>() {
                return Some((refusal.server_address(), refusal.server_id()));
            }
        }
        None
    }
}

impl From<NotLeaderError> for Error {
    fn from(refusal: NotLeaderError) -> Self {
        Error::Apply(Box::new(refusal))
    }
}

/// True iff `err` is the enqueue deadline error, or any error whose cause
/// chain reaches it.
pub fn is_deadline_exceeded(err: &(dyn std::error::Error + 'static)) -> bool {
    chain(err).any(|e| matches!(e.downcast_ref::<Error>(), Some(Error::DeadlineExceeded)))
}

/// Iterate an error and its transitive sources.
fn chain<'a>(
    err: &'a (dyn std::error::Error + 'static),
) -> impl Iterator<Item = &'a (dyn std::error::Error + 'static)> {
    std::iter::successors(Some(err), |e| e.source())
}
