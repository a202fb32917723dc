//! Blocking operation queue guarding access to the replicated log.
//!
//! The queue serializes client-initiated commands into a single-consumer
//! sequence while applying backpressure to producers. It is a handoff, not a
//! buffer: a producer's [`enqueue`](OpQueue::enqueue) succeeds only once the
//! apply worker has taken the operation and replied, and a producer that
//! cannot hand off within [`ENQUEUE_TIMEOUT`] is refused with
//! [`Error::DeadlineExceeded`]. The design forces callers to handle backing
//! off themselves; nothing is retried or buffered on their behalf.
//!
//! ```text
//! producers ──► OpQueue::enqueue ──(handoff)──► OpConsumer::recv ──► worker
//!     ▲                                                                │
//!     └──────────────────── OpDone::send(reply) ─────────────────────-┘
//! ```
//!
//! # Handoff protocol
//!
//! tokio's mpsc channel has no zero-capacity rendezvous, so the queue pairs a
//! depth-1 channel with a per-operation claim flag. The producer's deadline
//! and the consumer's receive race on the flag; the atomic swap decides the
//! winner. A producer that wins returns [`Error::DeadlineExceeded`] and the
//! operation is dropped inside [`OpConsumer::recv`] without ever becoming
//! visible. A consumer that wins commits the producer to the reply, however
//! long the apply takes.
//!
//! # Single flight
//!
//! The worker must reply to each operation before receiving the next. With a
//! depth of one, at most one operation is ever between handoff and reply, so
//! apply order is exactly handoff order (FIFO among producers that handed
//! off; entry order of still-waiting producers carries no guarantee).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;

use crate::constants::{ENQUEUE_TIMEOUT, OP_QUEUE_DEPTH};
use crate::error::{Error, Result};

/// A client-initiated command batch bound for the replicated log.
///
/// The mediator issues exactly one command per operation; the shape permits
/// future batching. Order within an operation is preserved end to end.
/// Operations must carry at least one command.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Opaque command payloads, applied in order.
    pub commands: Vec<Bytes>,
}

impl Operation {
    /// An operation carrying a single command.
    pub fn single(command: Bytes) -> Self {
        Self {
            commands: vec![command],
        }
    }
}

/// An operation in transit, with its claim flag and reply path.
struct EnqueuedOp {
    op: Operation,
    /// Set once, by whichever side wins the deadline race.
    claimed: Arc<AtomicBool>,
    done: oneshot::Sender<Result<()>>,
}

/// Producer half of the operation queue.
///
/// Cheap to clone; every API-facing task holds one.
#[derive(Clone)]
pub struct OpQueue {
    tx: mpsc::Sender<EnqueuedOp>,
}

/// Consumer half of the operation queue, held by the single apply worker.
pub struct OpConsumer {
    rx: mpsc::Receiver<EnqueuedOp>,
}

/// Reply token for one received operation.
///
/// Consuming `self` on [`send`](OpDone::send) makes "exactly one reply per
/// operation" a property of the type. Dropping the token without replying
/// reports [`Error::QueueClosed`] to the waiting producer.
#[must_use = "the producer blocks until this token is used or dropped"]
pub struct OpDone {
    tx: oneshot::Sender<Result<()>>,
}

impl OpDone {
    /// Deliver the apply outcome to the producer, verbatim.
    pub fn send(self, result: Result<()>) {
        // The producer may have been cancelled after handoff; its loss.
        let _ = self.tx.send(result);
    }
}

impl OpQueue {
    /// Create the two halves of the queue.
    pub fn new() -> (OpQueue, OpConsumer) {
        let (tx, rx) = mpsc::channel(OP_QUEUE_DEPTH);
        (OpQueue { tx }, OpConsumer { rx })
    }

    /// Hand an operation to the apply worker and wait for its reply.
    ///
    /// Blocks until the worker takes the operation and replies, or until
    /// [`ENQUEUE_TIMEOUT`] elapses while still waiting to hand off. On
    /// timeout the operation has not been and will never be observed by the
    /// worker. Once the worker has taken the operation the deadline no
    /// longer applies: the caller is committed to the outcome, and dropping
    /// this future after that point loses the reply.
    ///
    /// Returns the worker's reply verbatim, [`Error::DeadlineExceeded`] on
    /// timeout, or [`Error::QueueClosed`] if the consumer half is gone.
    pub async fn enqueue(&self, op: Operation) -> Result<()> {
        let claimed = Arc::new(AtomicBool::new(false));
        let (done_tx, mut done_rx) = oneshot::channel();
        let enqueued = EnqueuedOp {
            op,
            claimed: claimed.clone(),
            done: done_tx,
        };

        let deadline = sleep(ENQUEUE_TIMEOUT);
        tokio::pin!(deadline);

        // Phase one: place the operation into the handoff slot. On the
        // deadline branch the send future is dropped before completing, so
        // the operation never enters the channel.
        tokio::select! {
            sent = self.tx.send(enqueued) => {
                if sent.is_err() {
                    return Err(Error::QueueClosed);
                }
            }
            _ = &mut deadline => return Err(Error::DeadlineExceeded),
        }

        // Phase two: the operation sits in the slot until the worker takes
        // it. The same deadline still applies; taking it is the handoff.
        tokio::select! {
            reply = &mut done_rx => return flatten(reply),
            _ = &mut deadline => {
                if claimed
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    // Won the race: recv will discard the operation unseen.
                    return Err(Error::DeadlineExceeded);
                }
                // Lost the race: the worker took the operation first.
            }
        }

        flatten(done_rx.await)
    }
}

impl OpConsumer {
    /// Receive the next operation, in handoff order.
    ///
    /// Operations whose producer gave up at the deadline are discarded here
    /// and never returned. Yields `None` once every producer handle has been
    /// dropped.
    ///
    /// The worker must use or drop the returned [`OpDone`] before calling
    /// `recv` again; a reply is owed for every operation taken.
    pub async fn recv(&mut self) -> Option<(Operation, OpDone)> {
        while let Some(enqueued) = self.rx.recv().await {
            if enqueued
                .claimed
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                // The producer already returned DeadlineExceeded; the
                // operation must stay unseen.
                continue;
            }
            return Some((enqueued.op, OpDone { tx: enqueued.done }));
        }
        None
    }
}

/// Collapse the oneshot layer: a dropped reply token means the worker went
/// away mid-operation.
fn flatten(reply: std::result::Result<Result<()>, oneshot::error::RecvError>) -> Result<()> {
    match reply {
        Ok(result) => result,
        Err(_) => Err(Error::QueueClosed),
    }
}
