//! In-process loopback transport.
//!
//! Delivers frames straight into the destination node's inbound queue,
//! letting several dispatch loops exchange messages inside one process.
//! Suitable for single-process operation and tests; a real deployment would
//! put a socket transport behind the same port.

use async_trait::async_trait;
use corvus_dispatch::queue::{InboundQueue, TryEnqueueError};
use corvus_dispatch::{PeerMessage, PeerTransport, RequestFrame, ResponseFrame, TransportError};
use parking_lot::RwLock;
use shared_types::NodeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Routing table mapping node ids to their inbound queues.
///
/// Nodes register on startup and unregister on shutdown; sending to an
/// unregistered node reports `Unreachable`, which the dispatch loop turns
/// into a failed completion for the affected request.
#[derive(Default)]
pub struct LoopbackNetwork {
    routes: RwLock<HashMap<NodeId, InboundQueue>>,
}

impl LoopbackNetwork {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `node` reachable at `queue`.
    pub fn register(&self, node: NodeId, queue: InboundQueue) {
        self.routes.write().insert(node, queue);
        debug!(node = %node, "registered loopback route");
    }

    /// Drop the route for `node`; later sends to it fail as unreachable.
    pub fn unregister(&self, node: NodeId) {
        self.routes.write().remove(&node);
        debug!(node = %node, "unregistered loopback route");
    }

    /// Transport endpoint for one node. `local` becomes the sender identity
    /// stamped on every delivered message.
    #[must_use]
    pub fn transport_for(self: &Arc<Self>, local: NodeId) -> LoopbackTransport {
        LoopbackTransport {
            local,
            network: Arc::clone(self),
        }
    }

    fn deliver(&self, destination: NodeId, message: PeerMessage) -> Result<(), TransportError> {
        let queue = self
            .routes
            .read()
            .get(&destination)
            .cloned()
            .ok_or(TransportError::Unreachable(destination))?;
        // non-blocking on purpose: a full destination queue must not stall
        // the sender's event loop, so the frame is dropped like a lost
        // packet and the request side ends in a timeout
        queue.try_enqueue(message).map_err(|err| match err {
            TryEnqueueError::Full(_) => TransportError::SendFailed(format!(
                "inbound queue of {destination} is full"
            )),
            TryEnqueueError::Closed(_) => TransportError::Unreachable(destination),
        })
    }
}

/// Per-node endpoint implementing [`PeerTransport`] over the shared network.
pub struct LoopbackTransport {
    local: NodeId,
    network: Arc<LoopbackNetwork>,
}

#[async_trait]
impl PeerTransport for LoopbackTransport {
    async fn send_request(
        &self,
        destination: NodeId,
        frame: RequestFrame,
    ) -> Result<(), TransportError> {
        self.network.deliver(
            destination,
            PeerMessage::Request {
                sender: self.local,
                frame,
            },
        )
    }

    async fn send_response(
        &self,
        destination: NodeId,
        frame: ResponseFrame,
    ) -> Result<(), TransportError> {
        self.network.deliver(
            destination,
            PeerMessage::Response {
                sender: self.local,
                frame,
            },
        )
    }
}
