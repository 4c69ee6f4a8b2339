//! Inbound hand-off queue.
//!
//! The one concurrency-safe doorway from network receive threads into the
//! event loop. Producers clone [`InboundQueue`] freely; the single
//! [`InboundReceiver`] belongs to the event loop task and nothing else.
//!
//! The queue is bounded so a slow consensus loop surfaces as backpressure
//! on producers instead of unbounded memory growth. Order from a single
//! producer is preserved end to end; across producers the only guarantee is
//! that each message is observed exactly once.

use crate::domain::error::{DispatchError, DispatchResult};
use crate::domain::message::PeerMessage;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Create a bounded queue pair.
#[must_use]
pub fn inbound_queue(capacity: usize) -> (InboundQueue, InboundReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (InboundQueue { tx }, InboundReceiver { rx })
}

/// Producer half, cloneable across network receive threads.
#[derive(Clone)]
pub struct InboundQueue {
    tx: mpsc::Sender<PeerMessage>,
}

impl InboundQueue {
    /// Enqueue a decoded message, waiting for space if the queue is full.
    pub async fn enqueue(&self, message: PeerMessage) -> DispatchResult<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| DispatchError::QueueClosed)
    }

    /// Enqueue without waiting. The message is handed back on failure so
    /// callers can retry or drop it deliberately.
    pub fn try_enqueue(&self, message: PeerMessage) -> Result<(), TryEnqueueError> {
        self.tx.try_send(message).map_err(|err| match err {
            TrySendError::Full(message) => TryEnqueueError::Full(message),
            TrySendError::Closed(message) => TryEnqueueError::Closed(message),
        })
    }

    /// Configured bound of the queue.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Rejection reasons for [`InboundQueue::try_enqueue`].
#[derive(Debug, thiserror::Error)]
pub enum TryEnqueueError {
    #[error("inbound queue is full")]
    Full(PeerMessage),

    #[error("inbound queue is closed")]
    Closed(PeerMessage),
}

/// Consumer half. Event-loop task only.
pub struct InboundReceiver {
    rx: mpsc::Receiver<PeerMessage>,
}

impl InboundReceiver {
    /// Wait for the next message; `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<PeerMessage> {
        self.rx.recv().await
    }

    /// Take a message only if one is already queued.
    pub fn try_recv(&mut self) -> Option<PeerMessage> {
        self.rx.try_recv().ok()
    }
}
