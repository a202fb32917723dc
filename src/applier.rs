//! The apply worker: single consumer of the operation queue.
//!
//! The worker drains [`OpConsumer`] one operation at a time, forwards the
//! command batch to a [`RaftApplier`] (the seam behind which the replicated
//! state machine lives), and replies with the outcome before accepting the
//! next operation. Single flight is structural here: the loop never holds
//! more than one unanswered operation.
//!
//! Leadership is the applier's business. When the local node cannot accept
//! writes, the applier reports a [`NotLeaderError`] carrying the current
//! leader's coordinates; the queue transports it verbatim and the mediator
//! lifts it into the public [`Error::NotLeader`](crate::error::Error)
//! variant for the API layer.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error as ThisError;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::Result;
use crate::queue::OpConsumer;

/// Refusal reported by the apply worker when the local node is not the raft
/// leader.
///
/// Carries the coordinates of the node that is, so clients can be redirected
/// without another round trip. Address and id are opaque strings and must
/// round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("not currently the raft leader, try {server_address} (server {server_id})")]
pub struct NotLeaderError {
    server_address: String,
    server_id: String,
}

impl NotLeaderError {
    /// A refusal pointing at the given leader.
    pub fn new(server_address: impl Into<String>, server_id: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
            server_id: server_id.into(),
        }
    }

    /// Network address of the current leader.
    pub fn server_address(&self) -> &str {
        &self.server_address
    }

    /// Raft server id of the current leader.
    pub fn server_id(&self) -> &str {
        &self.server_id
    }
}

/// Capability implemented by the component that feeds the replicated state
/// machine.
///
/// An implementation submits the commands to the raft log and resolves once
/// they are committed and applied. It may fail with a boxed
/// [`NotLeaderError`] (via `Err(refusal.into())`) or any other apply-time
/// error; the queue and mediator never interpret the payload.
#[async_trait]
pub trait RaftApplier: Send + Sync {
    /// Apply one operation's commands, in order.
    async fn apply_operation(&self, commands: &[Bytes]) -> Result<()>;
}

/// The single-consumer loop between the operation queue and the raft log.
pub struct ApplyWorker<A> {
    consumer: OpConsumer,
    applier: A,
    shutdown: broadcast::Receiver<()>,
}

impl<A: RaftApplier> ApplyWorker<A> {
    /// Wire the worker to its queue half and its state machine seam.
    pub fn new(consumer: OpConsumer, applier: A, shutdown: broadcast::Receiver<()>) -> Self {
        Self {
            consumer,
            applier,
            shutdown,
        }
    }

    /// Run until shutdown is signalled or every producer is gone.
    ///
    /// Each received operation gets exactly one reply, sent before the next
    /// receive. Replies are the applier's outcome, verbatim.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    info!("apply worker shutting down");
                    return;
                }
                next = self.consumer.recv() => {
                    let Some((op, done)) = next else {
                        info!("operation queue drained, apply worker stopping");
                        return;
                    };
                    let result = self.applier.apply_operation(&op.commands).await;
                    if let Err(err) = &result {
                        debug!(error = %err, "lease apply failed");
                    }
                    done.send(result);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::Error;
    use crate::queue::{OpQueue, Operation};

    /// Records every applied command and replies from a script, falling back
    /// to success.
    struct RecordingApplier {
        applied: Mutex<Vec<Bytes>>,
        script: Mutex<Vec<Result<()>>>,
    }

    impl RecordingApplier {
        fn new(script: Vec<Result<()>>) -> Arc<Self> {
            Arc::new(Self {
                applied: Mutex::new(Vec::new()),
                script: Mutex::new(script),
            })
        }
    }

    #[async_trait]
    impl RaftApplier for Arc<RecordingApplier> {
        async fn apply_operation(&self, commands: &[Bytes]) -> Result<()> {
            self.applied.lock().unwrap().extend_from_slice(commands);
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Ok(())
            } else {
                script.remove(0)
            }
        }
    }

    #[tokio::test]
    async fn test_worker_applies_commands_in_order() {
        let applier = RecordingApplier::new(Vec::new());
        let (queue, consumer) = OpQueue::new();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let worker = tokio::spawn(ApplyWorker::new(consumer, applier.clone(), shutdown_rx).run());

        queue
            .enqueue(Operation {
                commands: vec![Bytes::from_static(b"first"), Bytes::from_static(b"second")],
            })
            .await
            .expect("enqueue");
        queue
            .enqueue(Operation::single(Bytes::from_static(b"third")))
            .await
            .expect("enqueue");

        drop(queue);
        worker.await.unwrap();

        assert_eq!(
            *applier.applied.lock().unwrap(),
            vec![
                Bytes::from_static(b"first"),
                Bytes::from_static(b"second"),
                Bytes::from_static(b"third"),
            ]
        );
    }

    #[tokio::test]
    async fn test_worker_forwards_refusal_verbatim() {
        let applier = RecordingApplier::new(vec![Err(
            NotLeaderError::new("10.0.0.2:17070", "3").into()
        )]);
        let (queue, consumer) = OpQueue::new();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let worker = tokio::spawn(ApplyWorker::new(consumer, applier.clone(), shutdown_rx).run());

        let err = queue
            .enqueue(Operation::single(Bytes::from_static(b"cmd")))
            .await
            .expect_err("applier refused");
        let (addr, id) = err.not_leader().expect("refusal coordinates");
        assert_eq!(addr, "10.0.0.2:17070");
        assert_eq!(id, "3");

        drop(queue);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let applier = RecordingApplier::new(Vec::new());
        let (queue, consumer) = OpQueue::new();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let worker = tokio::spawn(ApplyWorker::new(consumer, applier, shutdown_rx).run());

        shutdown_tx.send(()).expect("signal shutdown");
        worker.await.unwrap();

        // The worker is gone; producers now observe a closed queue once the
        // consumer half is dropped with it.
        let err = queue
            .enqueue(Operation::single(Bytes::from_static(b"late")))
            .await
            .expect_err("worker stopped");
        assert!(matches!(err, Error::QueueClosed));
    }

    #[test]
    fn test_not_leader_error_accessors() {
        let refusal = NotLeaderError::new("10.0.0.2:17070", "3");
        assert_eq!(refusal.server_address(), "10.0.0.2:17070");
        assert_eq!(refusal.server_id(), "3");
        assert!(refusal.to_string().contains("10.0.0.2:17070"));
    }
}
