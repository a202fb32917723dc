//! Mediator between API facades and the raft apply pipeline.
//!
//! Facades hand the mediator raw command bytes; the mediator wraps them as a
//! single-command [`Operation`], pushes it through the queue, and classifies
//! the outcome into the three classes callers can act on: success,
//! leader redirect, or backpressure. Everything else is propagated verbatim
//! for the caller's policy to decide. The mediator holds no state between
//! calls and is safe for any number of concurrent producers.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{Level, trace};

use crate::error::{Error, Result};
use crate::queue::{OpQueue, Operation};

/// Capability to enqueue operations toward the replicated log.
///
/// The queue is a blocking handoff: callers of [`enqueue`](LeaseQueue::enqueue)
/// must handle backing off when the deadline is refused. Abstracting it as a
/// trait lets the mediator be tested against a scripted fake with no raft
/// behind it.
#[async_trait]
pub trait LeaseQueue: Send + Sync {
    /// Hand an operation to the apply worker and wait for its reply.
    async fn enqueue(&self, op: Operation) -> Result<()>;
}

#[async_trait]
impl LeaseQueue for OpQueue {
    async fn enqueue(&self, op: Operation) -> Result<()> {
        // Inherent method; resolution prefers it over the trait's.
        self.enqueue(op).await
    }
}

/// Raft capabilities exposed to the API facades.
pub struct RaftMediator {
    queue: Arc<dyn LeaseQueue>,
}

impl RaftMediator {
    /// A mediator submitting to the given queue.
    pub fn new(queue: Arc<dyn LeaseQueue>) -> Self {
        Self { queue }
    }

    /// Apply a lease command to the raft state machine.
    ///
    /// Enqueues the command and waits for the apply outcome. If the node is
    /// busy with an application already, backpressure reaches the caller as
    /// [`Error::DeadlineExceeded`]; it is up to the caller to retry or drop,
    /// nothing is retried here. If the local node cannot accept writes the
    /// returned [`Error::NotLeader`] carries the leader's address and server
    /// id, lifted unchanged from the worker's refusal, so the API layer can
    /// answer with a structured redirect.
    pub async fn apply_lease(&self, cmd: Bytes) -> Result<()> {
        if tracing::enabled!(Level::TRACE) {
            trace!(command = %String::from_utf8_lossy(&cmd), "applying lease command");
        }

        match self.queue.enqueue(Operation::single(cmd)).await {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Some((server_address, server_id)) = err.not_leader() {
                    trace!(
                        leader_address = %server_address,
                        leader_id = %server_id,
                        "not currently the leader, redirecting"
                    );
                    return Err(Error::NotLeader {
                        server_address: server_address.to_string(),
                        server_id: server_id.to_string(),
                    });
                }
                if err.is_deadline_exceeded() {
                    return Err(Error::DeadlineExceeded);
                }
                Err(err)
            }
        }
    }
}
