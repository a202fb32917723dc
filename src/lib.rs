//! # raftlease
//! Blocking operation queue and apply mediator for raft-replicated lease
//! commands.
//!
//! Cluster controllers replicate lease claims through a raft log: every
//! client-initiated command must be serialized onto the log by the one node
//! that leads the cluster, one command at a time. This crate provides the
//! layer that does the serializing — a single-slot blocking handoff queue
//! with a fixed enqueue deadline, and a mediator that turns queue outcomes
//! into the three answers an API layer can act on: applied, redirect to the
//! leader, or back off.
//!
//! # Goals
//! - Make "at most one operation in flight" structural, not checked
//! - Surface backpressure as an error the caller handles, never absorb it
//! - Carry leader-redirect coordinates to the client without extra round trips
//!
//! # Architecture
//!
//! ```text
//! facade ── cmd bytes ──► RaftMediator::apply_lease
//!                              │
//!                              ▼
//!                      OpQueue::enqueue ──(handoff)──► ApplyWorker ──► RaftApplier
//!                              ▲                            │         (raft log)
//!                              └───── reply (OpDone) ───────┘
//! ```
//!
//! Producers race the handoff against
//! [`ENQUEUE_TIMEOUT`](constants::ENQUEUE_TIMEOUT); a refused producer gets
//! [`Error::DeadlineExceeded`](error::Error::DeadlineExceeded) and its
//! operation is guaranteed never to reach the worker. The worker replies to
//! exactly one operation at a time; when the local node is not the leader it
//! reports the coordinates of the node that is, and the mediator lifts them
//! into [`Error::NotLeader`](error::Error::NotLeader) for the client.
//!
//! The raft state machine itself — log storage, elections, transport — lives
//! behind the [`RaftApplier`](applier::RaftApplier) seam and is not this
//! crate's business. Nothing here persists state, batches commands across
//! callers, re-orders operations, or retries on the caller's behalf.
//!
//! ## Getting started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use bytes::Bytes;
//! use raftlease::applier::{ApplyWorker, RaftApplier};
//! use raftlease::mediator::RaftMediator;
//! use raftlease::queue::OpQueue;
//!
//! struct LogApplier;
//!
//! #[async_trait]
//! impl RaftApplier for LogApplier {
//!     async fn apply_operation(&self, _commands: &[Bytes]) -> raftlease::error::Result<()> {
//!         // submit to the raft log, resolve once committed and applied
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let (queue, consumer) = OpQueue::new();
//!     let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
//!     tokio::spawn(ApplyWorker::new(consumer, LogApplier, shutdown_rx).run());
//!
//!     let mediator = RaftMediator::new(Arc::new(queue));
//!     match mediator.apply_lease(Bytes::from_static(b"claim: m#0#")).await {
//!         Ok(()) => {}
//!         Err(err) if err.is_deadline_exceeded() => { /* shed load */ }
//!         Err(err) if err.is_not_leader() => { /* redirect the client */ }
//!         Err(_err) => { /* surface the apply failure */ }
//!     }
//!     drop(shutdown_tx);
//! }
//! ```

#![forbid(unsafe_code)]

pub mod applier;
pub mod constants;
pub mod error;
pub mod mediator;
pub mod queue;
pub mod telemetry;

pub mod prelude {
    //! Main exports for embedding the queue and mediator.
    pub use crate::applier::{ApplyWorker, NotLeaderError, RaftApplier};
    pub use crate::constants::ENQUEUE_TIMEOUT;
    pub use crate::error::{Error, Result, is_deadline_exceeded};
    pub use crate::mediator::{LeaseQueue, RaftMediator};
    pub use crate::queue::{OpConsumer, OpDone, OpQueue, Operation};

    pub use bytes;
}
