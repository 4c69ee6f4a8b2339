//! Error types for the dispatch core.

use crate::domain::correlation::CorrelationId;
use shared_types::NodeId;
use std::time::Duration;

/// Terminal failure reasons for a dispatched request, plus the loop-fatal
/// invariant violations.
///
/// Every variant that can reach a caller does so through a failed
/// [`CompletionHandle`](crate::domain::CompletionHandle), never as a
/// synchronous error from submission. `DuplicateCorrelation` and
/// `CorrelationSpaceExhausted` additionally stop the event loop: they mean
/// the pending table's uniqueness invariant can no longer be upheld.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("destination {node} unreachable: {reason}")]
    NodeUnreachable { node: NodeId, reason: String },

    #[error("request cancelled: dispatch layer is shutting down")]
    Cancelled,

    #[error("peer rejected request with protocol error {code}: {message}")]
    Protocol { code: i32, message: String },

    #[error("correlation id {0} is already registered")]
    DuplicateCorrelation(CorrelationId),

    #[error("correlation id space exhausted with {pending} requests pending")]
    CorrelationSpaceExhausted { pending: usize },

    #[error("inbound queue is closed")]
    QueueClosed,
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
