//! Request envelopes and their paired responses.
//!
//! A request is one envelope seen from two sides: [`InboundRequest`] (a peer
//! asked us, we owe it an [`OutboundResponse`]) and [`OutboundRequest`] (we
//! asked a peer, we are owed an [`InboundResponse`]). [`RequestEnvelope`]
//! is the sum over both carrying the fields they share.

use crate::domain::completion::CompletionHandle;
use crate::domain::correlation::CorrelationId;
use crate::domain::message::{RequestFrame, ResponseFrame, ResponseOutcome};
use bytes::Bytes;
use shared_types::NodeId;
use std::fmt;
use tokio::time::Instant;

/// A request received from a peer, awaiting a locally produced response.
///
/// Protocol logic takes ownership of the envelope and must eventually
/// resolve its completion handle — with [`respond`](Self::respond) /
/// [`respond_error`](Self::respond_error) for a protocol-level answer, or by
/// failing the handle if local handling broke down. Dropping the envelope
/// unresolved means no response is ever sent and the peer times out.
pub struct InboundRequest {
    correlation_id: CorrelationId,
    protocol_version: u16,
    payload: Bytes,
    sender: NodeId,
    created_at: Instant,
    completion: CompletionHandle<OutboundResponse>,
}

impl InboundRequest {
    /// Build an envelope for a request decoded off the wire. Stamps the
    /// creation time; the completion handle starts unresolved.
    #[must_use]
    pub fn new(
        sender: NodeId,
        correlation_id: CorrelationId,
        protocol_version: u16,
        payload: Bytes,
    ) -> Self {
        Self {
            correlation_id,
            protocol_version,
            payload,
            sender,
            created_at: Instant::now(),
            completion: CompletionHandle::new(),
        }
    }

    #[must_use]
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    #[must_use]
    pub fn protocol_version(&self) -> u16 {
        self.protocol_version
    }

    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    #[must_use]
    pub fn sender(&self) -> NodeId {
        self.sender
    }

    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Completion handle protocol logic resolves with the response to send
    /// back.
    #[must_use]
    pub fn completion(&self) -> &CompletionHandle<OutboundResponse> {
        &self.completion
    }

    /// Resolve the envelope with a successful response payload.
    ///
    /// # Panics
    ///
    /// Panics if the envelope was already resolved.
    pub fn respond(&self, payload: Bytes) {
        self.completion.complete(OutboundResponse {
            correlation_id: self.correlation_id,
            protocol_version: self.protocol_version,
            outcome: ResponseOutcome::Success(payload),
        });
    }

    /// Resolve the envelope with a protocol-level error response.
    ///
    /// # Panics
    ///
    /// Panics if the envelope was already resolved.
    pub fn respond_error(&self, code: i32, message: impl Into<String>) {
        self.completion.complete(OutboundResponse {
            correlation_id: self.correlation_id,
            protocol_version: self.protocol_version,
            outcome: ResponseOutcome::Error {
                code,
                message: message.into(),
            },
        });
    }
}

impl fmt::Display for InboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InboundRequest(correlation_id={}, sender={}, payload_len={})",
            self.correlation_id,
            self.sender,
            self.payload.len()
        )
    }
}

/// A request this node sent to a peer, awaiting that peer's response.
pub struct OutboundRequest {
    correlation_id: CorrelationId,
    protocol_version: u16,
    payload: Bytes,
    destination: NodeId,
    created_at: Instant,
    completion: CompletionHandle<InboundResponse>,
}

impl OutboundRequest {
    /// Build an envelope for transmission. Stamps the creation time, which
    /// is immutable afterwards and is the sole basis for timeout sweeps.
    #[must_use]
    pub fn new(
        correlation_id: CorrelationId,
        protocol_version: u16,
        payload: Bytes,
        destination: NodeId,
        completion: CompletionHandle<InboundResponse>,
    ) -> Self {
        Self {
            correlation_id,
            protocol_version,
            payload,
            destination,
            created_at: Instant::now(),
            completion,
        }
    }

    #[must_use]
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    #[must_use]
    pub fn protocol_version(&self) -> u16 {
        self.protocol_version
    }

    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    #[must_use]
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Completion handle that resolves when a matching response arrives,
    /// the request times out, or the destination is deemed unreachable.
    #[must_use]
    pub fn completion(&self) -> &CompletionHandle<InboundResponse> {
        &self.completion
    }

    /// Wire view for the transport. Payload buffers are shared, not copied.
    #[must_use]
    pub fn frame(&self) -> RequestFrame {
        RequestFrame {
            correlation_id: self.correlation_id,
            protocol_version: self.protocol_version,
            payload: self.payload.clone(),
        }
    }
}

impl fmt::Display for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OutboundRequest(correlation_id={}, destination={}, payload_len={})",
            self.correlation_id,
            self.destination,
            self.payload.len()
        )
    }
}

/// A request envelope in either direction, carrying the common fields.
pub enum RequestEnvelope {
    Inbound(InboundRequest),
    Outbound(OutboundRequest),
}

impl RequestEnvelope {
    #[must_use]
    pub fn correlation_id(&self) -> CorrelationId {
        match self {
            RequestEnvelope::Inbound(request) => request.correlation_id(),
            RequestEnvelope::Outbound(request) => request.correlation_id(),
        }
    }

    #[must_use]
    pub fn protocol_version(&self) -> u16 {
        match self {
            RequestEnvelope::Inbound(request) => request.protocol_version(),
            RequestEnvelope::Outbound(request) => request.protocol_version(),
        }
    }

    #[must_use]
    pub fn payload(&self) -> &Bytes {
        match self {
            RequestEnvelope::Inbound(request) => request.payload(),
            RequestEnvelope::Outbound(request) => request.payload(),
        }
    }

    #[must_use]
    pub fn created_at(&self) -> Instant {
        match self {
            RequestEnvelope::Inbound(request) => request.created_at(),
            RequestEnvelope::Outbound(request) => request.created_at(),
        }
    }
}

impl fmt::Display for RequestEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestEnvelope::Inbound(request) => fmt::Display::fmt(request, f),
            RequestEnvelope::Outbound(request) => fmt::Display::fmt(request, f),
        }
    }
}

/// A peer's response delivered to the caller that submitted the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundResponse {
    /// Peer that answered.
    pub source: NodeId,
    pub correlation_id: CorrelationId,
    pub protocol_version: u16,
    pub payload: Bytes,
}

/// A locally produced response on its way back to the requesting peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundResponse {
    pub correlation_id: CorrelationId,
    pub protocol_version: u16,
    pub outcome: ResponseOutcome,
}

impl OutboundResponse {
    /// Wire view for the transport.
    #[must_use]
    pub fn frame(&self) -> ResponseFrame {
        ResponseFrame {
            correlation_id: self.correlation_id,
            protocol_version: self.protocol_version,
            outcome: self.outcome.clone(),
        }
    }
}
