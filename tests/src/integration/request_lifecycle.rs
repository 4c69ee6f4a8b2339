//! # Request Lifecycle Integration Tests
//!
//! Exercises the full path from submission to terminal event through the
//! public surface of `corvus-dispatch` wired to the loopback adapters from
//! `node-runtime`: exactly one terminal event per request, correlation id
//! uniqueness under concurrency, and timeout behavior on deterministic
//! virtual time.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use rand::{Rng, SeedableRng};

    use corvus_dispatch::{
        DispatchApi, DispatchConfig, DispatchError, InboundRequest, RequestHandler,
    };
    use node_runtime::LocalCluster;
    use shared_types::NodeId;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn fast_config() -> DispatchConfig {
        DispatchConfig {
            request_timeout: Duration::from_millis(200),
            shutdown_grace: Duration::from_millis(100),
            inbound_queue_capacity: 128,
            tick_interval: Duration::from_millis(5),
        }
    }

    /// Protocol logic that never answers, to force timeouts.
    struct SilentHandler;

    #[async_trait]
    impl RequestHandler for SilentHandler {
        async fn handle_request(&self, _request: InboundRequest) {}
    }

    fn random_payload(seed: u64, len: usize) -> Bytes {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut payload = vec![0u8; len];
        rng.fill(payload.as_mut_slice());
        Bytes::from(payload)
    }

    // =============================================================================
    // END-TO-END LIFECYCLE
    // =============================================================================

    /// Submit with payload P to destination X; a matching response arrives
    /// before the timeout; the handle resolves with the response payload.
    #[tokio::test]
    async fn test_response_before_timeout_completes() {
        let mut cluster = LocalCluster::new();
        let a = cluster.spawn_node(NodeId::new(1), fast_config());
        cluster.spawn_node(NodeId::new(2), fast_config());

        let payload = random_payload(7, 64);
        let response = a
            .submit(NodeId::new(2), payload.clone())
            .resolved()
            .await
            .unwrap();

        assert_eq!(response.source, NodeId::new(2));
        assert_eq!(response.payload, payload);

        let stats = a.stats();
        assert_eq!(stats.total_submitted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.total_completed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.total_timeouts.load(Ordering::Relaxed), 0);

        cluster.shutdown().await;
    }

    /// Submit; no response ever arrives; the handle resolves with Timeout at
    /// or after the configured duration, and only once.
    #[tokio::test(start_paused = true)]
    async fn test_no_response_resolves_timeout() {
        let mut cluster = LocalCluster::new();
        let a = cluster.spawn_node(NodeId::new(1), fast_config());
        cluster.spawn_node_with_handler(NodeId::new(2), fast_config(), Arc::new(SilentHandler));

        let submitted_at = tokio::time::Instant::now();
        let completion = a.submit(NodeId::new(2), Bytes::from_static(b"ping"));

        assert_eq!(
            completion.resolved().await,
            Err(DispatchError::Timeout {
                timeout: Duration::from_millis(200)
            })
        );
        assert!(tokio::time::Instant::now() - submitted_at >= Duration::from_millis(200));
        assert_eq!(a.stats().total_timeouts.load(Ordering::Relaxed), 1);

        cluster.shutdown().await;
    }

    /// Two requests submitted concurrently from different tasks receive
    /// distinct correlation ids and resolve independently with their own
    /// payloads, whichever response arrives first.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submissions_resolve_independently() {
        let mut cluster = LocalCluster::new();
        let a = cluster.spawn_node(NodeId::new(1), fast_config());
        cluster.spawn_node(NodeId::new(2), fast_config());

        let mut tasks = Vec::new();
        for seed in 0..8u64 {
            let handle = a.clone();
            tasks.push(tokio::spawn(async move {
                let payload = random_payload(seed, 32);
                let response = handle
                    .submit(NodeId::new(2), payload.clone())
                    .resolved()
                    .await
                    .unwrap();
                (payload, response)
            }));
        }

        let mut seen_ids = std::collections::HashSet::new();
        for task in tasks {
            let (payload, response) = task.await.unwrap();
            // each caller got exactly its own echo back
            assert_eq!(response.payload, payload);
            assert!(seen_ids.insert(response.correlation_id));
        }
        assert_eq!(seen_ids.len(), 8);

        cluster.shutdown().await;
    }

    /// A blocking caller on a plain thread observes resolution through
    /// `wait()` without any async machinery of its own.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_caller_observes_resolution() {
        let mut cluster = LocalCluster::new();
        let a = cluster.spawn_node(NodeId::new(1), fast_config());
        cluster.spawn_node(NodeId::new(2), fast_config());

        let completion = a.submit(NodeId::new(2), Bytes::from_static(b"sync"));
        let waiter = std::thread::spawn(move || completion.wait());

        let response = waiter.join().unwrap().unwrap();
        assert_eq!(&response.payload[..], b"sync");

        cluster.shutdown().await;
    }

    /// Exactly one terminal event: a request that times out is not resolved
    /// a second time when its response finally straggles in.
    #[tokio::test(start_paused = true)]
    async fn test_straggler_response_cannot_resolve_twice() {
        let mut cluster = LocalCluster::new();
        let a = cluster.spawn_node(NodeId::new(1), fast_config());
        cluster.spawn_node_with_handler(NodeId::new(2), fast_config(), Arc::new(SilentHandler));

        let completion = a.submit(NodeId::new(2), Bytes::from_static(b"ping"));
        let resolutions = Arc::new(AtomicUsize::new(0));
        {
            let resolutions = Arc::clone(&resolutions);
            completion.on_resolve(move |_| {
                resolutions.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(matches!(
            completion.resolved().await,
            Err(DispatchError::Timeout { .. })
        ));

        // a stray response for the already-swept id is silently discarded;
        // the allocator issues id 1 to the first submission
        let stray = corvus_dispatch::PeerMessage::Response {
            sender: NodeId::new(2),
            frame: corvus_dispatch::ResponseFrame {
                correlation_id: corvus_dispatch::CorrelationId::from_raw(1),
                protocol_version: shared_types::PROTOCOL_VERSION,
                outcome: corvus_dispatch::ResponseOutcome::Success(Bytes::from_static(b"late")),
            },
        };
        a.inbound_queue().enqueue(stray).await.unwrap();

        let stats = a.stats();
        for _ in 0..100 {
            if stats.total_unknown_responses.load(Ordering::Relaxed) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(stats.total_unknown_responses.load(Ordering::Relaxed), 1);
        assert_eq!(resolutions.load(Ordering::SeqCst), 1);

        cluster.shutdown().await;
    }

    /// Submitting to a node with no route resolves NodeUnreachable, not a
    /// synchronous error.
    #[tokio::test]
    async fn test_unroutable_destination_unreachable() {
        let mut cluster = LocalCluster::new();
        let a = cluster.spawn_node(NodeId::new(1), fast_config());

        let completion = a.submit(NodeId::new(42), Bytes::from_static(b"void"));
        match completion.resolved().await {
            Err(DispatchError::NodeUnreachable { node, .. }) => {
                assert_eq!(node, NodeId::new(42));
            }
            other => panic!("expected NodeUnreachable, got {other:?}"),
        }
        assert_eq!(a.stats().total_unreachable.load(Ordering::Relaxed), 1);

        cluster.shutdown().await;
    }
}
