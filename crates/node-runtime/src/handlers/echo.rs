//! Echo protocol handler.

use async_trait::async_trait;
use corvus_dispatch::{InboundRequest, RequestHandler};
use tracing::trace;

/// Answers every request with its own payload.
///
/// Stands in for the consensus state machine in the demo binary and in
/// integration tests; the dispatch layer treats payloads as opaque either
/// way.
pub struct EchoHandler;

#[async_trait]
impl RequestHandler for EchoHandler {
    async fn handle_request(&self, request: InboundRequest) {
        trace!(request = %request, "echoing request payload");
        request.respond(request.payload().clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use corvus_dispatch::{CorrelationId, ResponseOutcome};
    use shared_types::{NodeId, PROTOCOL_VERSION};

    #[tokio::test]
    async fn test_echoes_payload() {
        let request = InboundRequest::new(
            NodeId::new(3),
            CorrelationId::from_raw(1),
            PROTOCOL_VERSION,
            Bytes::from_static(b"marco"),
        );
        let completion = request.completion().clone();

        EchoHandler.handle_request(request).await;

        let response = completion.result().unwrap().unwrap();
        assert_eq!(
            response.outcome,
            ResponseOutcome::Success(Bytes::from_static(b"marco"))
        );
    }
}
