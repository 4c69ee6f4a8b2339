//! # Cluster Integration Tests
//!
//! Multi-node flows over the loopback network: cross-node echo, protocol
//! error surfacing, and clean teardown of a whole cluster.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use corvus_dispatch::{
        DispatchApi, DispatchConfig, DispatchError, InboundRequest, RequestHandler,
    };
    use node_runtime::LocalCluster;
    use shared_types::NodeId;

    fn config() -> DispatchConfig {
        DispatchConfig {
            request_timeout: Duration::from_secs(5),
            shutdown_grace: Duration::from_millis(100),
            inbound_queue_capacity: 128,
            tick_interval: Duration::from_millis(5),
        }
    }

    /// Protocol logic that rejects every request with a protocol error.
    struct RejectingHandler;

    #[async_trait]
    impl RequestHandler for RejectingHandler {
        async fn handle_request(&self, request: InboundRequest) {
            request.respond_error(-32001, "not the leader");
        }
    }

    /// Every node can reach every other node; each response comes from the
    /// node that was asked.
    #[tokio::test]
    async fn test_full_mesh_echo() {
        let mut cluster = LocalCluster::new();
        for raw in 1..=3u64 {
            cluster.spawn_node(NodeId::new(raw), config());
        }

        for from in cluster.node_ids() {
            for to in cluster.node_ids() {
                if from == to {
                    continue;
                }
                let payload = Bytes::from(format!("{from}->{to}").into_bytes());
                let response = cluster
                    .handle(from)
                    .unwrap()
                    .submit(to, payload.clone())
                    .resolved()
                    .await
                    .unwrap();
                assert_eq!(response.source, to);
                assert_eq!(response.payload, payload);
            }
        }

        cluster.shutdown().await;
    }

    /// A peer's protocol-level rejection surfaces as a failed completion
    /// carrying the peer's error payload.
    #[tokio::test]
    async fn test_peer_rejection_surfaces_as_protocol_error() {
        let mut cluster = LocalCluster::new();
        let a = cluster.spawn_node(NodeId::new(1), config());
        cluster.spawn_node_with_handler(NodeId::new(2), config(), Arc::new(RejectingHandler));

        let completion = a.submit(NodeId::new(2), Bytes::from_static(b"append"));
        assert_eq!(
            completion.resolved().await,
            Err(DispatchError::Protocol {
                code: -32001,
                message: "not the leader".into()
            })
        );

        cluster.shutdown().await;
    }

    /// Requests keep flowing while an unrelated node is torn down: only the
    /// requests addressed to the dead node fail.
    #[tokio::test]
    async fn test_unrelated_traffic_survives_node_loss() {
        let mut cluster = LocalCluster::new();
        let a = cluster.spawn_node(NodeId::new(1), config());
        cluster.spawn_node(NodeId::new(2), config());
        cluster.spawn_node(NodeId::new(3), config());

        // cut node 3 out of the routing table
        cluster.network().unregister(NodeId::new(3));

        let dead = a.submit(NodeId::new(3), Bytes::from_static(b"lost"));
        let alive = a.submit(NodeId::new(2), Bytes::from_static(b"fine"));

        assert!(matches!(
            dead.resolved().await,
            Err(DispatchError::NodeUnreachable { .. })
        ));
        assert_eq!(&alive.resolved().await.unwrap().payload[..], b"fine");

        cluster.shutdown().await;
    }

    /// Shutting the cluster down resolves every outstanding request and
    /// leaves no loop running.
    #[tokio::test]
    async fn test_cluster_teardown_is_clean() {
        let mut cluster = LocalCluster::new();
        let a = cluster.spawn_node(NodeId::new(1), config());
        cluster.spawn_node(NodeId::new(2), config());

        let response = a
            .submit(NodeId::new(2), Bytes::from_static(b"ping"))
            .resolved()
            .await
            .unwrap();
        assert_eq!(&response.payload[..], b"ping");

        cluster.shutdown().await;

        // the loops are gone; a new submission is refused asynchronously
        let refused = a.submit(NodeId::new(2), Bytes::from_static(b"too late"));
        assert_eq!(refused.resolved().await, Err(DispatchError::Cancelled));
    }
}
