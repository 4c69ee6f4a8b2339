//! Decoded wire messages and the frame views handed to the transport.
//!
//! The network collaborator decodes bytes off the wire into [`PeerMessage`]
//! values and enqueues them; in the other direction the event loop hands it
//! [`RequestFrame`]/[`ResponseFrame`] views that carry everything a codec
//! needs and nothing it must not see (completion handles never cross the
//! transport port).

use crate::domain::correlation::CorrelationId;
use bytes::Bytes;
use shared_types::NodeId;

/// Protocol error code reported to a peer when local handling fails before
/// a response could be produced.
pub const INTERNAL_ERROR_CODE: i32 = -32603;

/// Wire view of an outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    pub correlation_id: CorrelationId,
    pub protocol_version: u16,
    pub payload: Bytes,
}

/// Wire view of a response traveling in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub correlation_id: CorrelationId,
    pub protocol_version: u16,
    pub outcome: ResponseOutcome,
}

/// Payload of a response: either the peer's answer or a protocol-level
/// rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    Success(Bytes),
    Error { code: i32, message: String },
}

impl ResponseOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseOutcome::Success(_))
    }
}

/// A decoded message delivered by the network collaborator.
///
/// `sender` identifies the peer the message arrived from: for requests it is
/// where the response must be addressed, for responses it is the peer that
/// answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    Request { sender: NodeId, frame: RequestFrame },
    Response { sender: NodeId, frame: ResponseFrame },
}

impl PeerMessage {
    #[must_use]
    pub fn correlation_id(&self) -> CorrelationId {
        match self {
            PeerMessage::Request { frame, .. } => frame.correlation_id,
            PeerMessage::Response { frame, .. } => frame.correlation_id,
        }
    }

    #[must_use]
    pub fn sender(&self) -> NodeId {
        match self {
            PeerMessage::Request { sender, .. } | PeerMessage::Response { sender, .. } => *sender,
        }
    }
}
