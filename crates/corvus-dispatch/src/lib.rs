//! # Corvus Dispatch - Correlated Request/Response Core
//!
//! Pairs asynchronous peer messages traveling in both directions (this node
//! issuing RPCs to peers; this node receiving RPCs from peers) with exactly
//! the logic waiting for each one, across thread boundaries, under peer
//! failure, and under shutdown.
//!
//! ## Architecture
//!
//! A single tokio task (the event loop) exclusively owns all correlation
//! state; everything else talks to it through channels:
//!
//! ```text
//!  callers (any thread)         network receive threads
//!        │ submit()                    │ enqueue()
//!        ▼                             ▼
//!  ┌──────────────┐           ┌─────────────────┐
//!  │ command chan │           │  InboundQueue   │
//!  └──────┬───────┘           └────────┬────────┘
//!         │                            │
//!         ▼                            ▼
//!  ┌────────────────────────────────────────────┐
//!  │            ConsensusEventLoop              │
//!  │  CorrelationIdAllocator                    │
//!  │  PendingRequestTable                       │
//!  │  TimeoutSweeper                            │
//!  └──────┬─────────────────────────┬───────────┘
//!         │ send_request/response   │ handle_request
//!         ▼                         ▼
//!    PeerTransport            RequestHandler
//! ```
//!
//! ## Guarantees
//!
//! - Every submitted request reaches exactly one terminal event: matched
//!   response, timeout, transport failure, or cancellation on shutdown.
//! - Responses are matched by correlation id, never by arrival order;
//!   out-of-order and duplicate deliveries are tolerated.
//! - [`CompletionHandle`] is the only structure shared across threads; the
//!   pending table and allocator never leave the event loop.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod domain;
pub mod ports;
pub mod queue;
pub mod service;

// Re-export main types
pub use domain::{
    CompletionHandle, CompletionResult, CorrelationId, CorrelationIdAllocator, DispatchConfig,
    DispatchError, DispatchResult, InboundRequest, InboundResponse, OutboundRequest,
    OutboundResponse, PeerMessage, PendingRequestTable, RequestEnvelope, RequestFrame,
    ResponseFrame, ResponseOutcome,
};
pub use ports::{DispatchApi, PeerTransport, RequestHandler, TransportError};
pub use queue::{InboundQueue, TryEnqueueError};
pub use service::{
    ConsensusEventLoop, DispatchDependencies, DispatchHandle, DispatchService, DispatchStats,
};
pub use shared_types::PROTOCOL_VERSION;

/// Default bound of the inbound hand-off queue before producers see
/// backpressure.
pub const DEFAULT_INBOUND_CAPACITY: usize = 1000;
