//! Driven ports (outbound dependencies of the event loop).

use crate::domain::envelope::InboundRequest;
use crate::domain::message::{RequestFrame, ResponseFrame};
use async_trait::async_trait;
use shared_types::NodeId;

/// Transport-level send failures.
///
/// These never reach a caller directly; the event loop converts them into a
/// failed completion (`NodeUnreachable`) for the affected request.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("node {0} is not reachable")]
    Unreachable(NodeId),

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Outbound half of the network collaborator.
///
/// Implementations hand frames to their transmit machinery and return; they
/// must not block on a network round trip, because both methods are awaited
/// on the event loop task. An error return means the frame was definitely
/// not queued for transmission.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Queue a request frame for transmission to `destination`.
    async fn send_request(
        &self,
        destination: NodeId,
        frame: RequestFrame,
    ) -> Result<(), TransportError>;

    /// Queue a response frame for transmission to `destination`.
    async fn send_response(
        &self,
        destination: NodeId,
        frame: ResponseFrame,
    ) -> Result<(), TransportError>;
}

/// Protocol-logic collaborator for requests received from peers.
///
/// The handler owns the envelope and must eventually resolve its completion
/// (see [`InboundRequest::respond`]); the dispatch layer then routes the
/// resulting response back to the requesting peer. Handlers run on their own
/// tasks, so slow handling never stalls the event loop — but handlers must
/// observe shutdown themselves if they perform long-running work.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle_request(&self, request: InboundRequest);
}
