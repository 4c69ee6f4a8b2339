//! Driving ports (callers of the dispatch core).

use crate::domain::completion::CompletionHandle;
use crate::domain::envelope::InboundResponse;
use bytes::Bytes;
use shared_types::NodeId;

/// Submission surface of the dispatch layer, callable from any thread.
///
/// Submission is inherently asynchronous: the returned handle resolves with
/// the peer's response or with `Timeout` / `NodeUnreachable` / `Cancelled`.
/// No failure mode is ever reported synchronously from `submit` itself.
pub trait DispatchApi: Send + Sync {
    /// Submit a request for `destination`.
    ///
    /// The correlation id is allocated inside the event loop (single-writer
    /// rule), so the caller observes only the completion handle.
    fn submit(&self, destination: NodeId, payload: Bytes) -> CompletionHandle<InboundResponse>;

    /// Signal cooperative shutdown: stop accepting new submissions, let
    /// in-flight work finish within the grace period, then cancel the rest.
    fn shutdown(&self);
}
