//! # Shutdown Integration Tests
//!
//! Drain behavior end to end: pending requests are cancelled exactly once,
//! in-flight work may still finish within the grace period, and submissions
//! after shutdown are refused asynchronously.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
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
            // longer than any test runs, so cancellation always wins the race
            request_timeout: Duration::from_secs(60),
            shutdown_grace: Duration::from_millis(100),
            inbound_queue_capacity: 128,
            tick_interval: Duration::from_millis(5),
        }
    }

    /// Protocol logic that never answers.
    struct SilentHandler;

    #[async_trait]
    impl RequestHandler for SilentHandler {
        async fn handle_request(&self, _request: InboundRequest) {}
    }

    /// N pending requests, then shutdown: every handle resolves Cancelled,
    /// none resolves twice, and the loop reports a clean stop.
    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_every_pending_request_once() {
        let mut cluster = LocalCluster::new();
        let a = cluster.spawn_node(NodeId::new(1), config());
        cluster.spawn_node_with_handler(NodeId::new(2), config(), Arc::new(SilentHandler));

        let resolutions = Arc::new(AtomicUsize::new(0));
        let completions: Vec<_> = (0..10)
            .map(|i| {
                let completion =
                    a.submit(NodeId::new(2), Bytes::from(format!("req-{i}").into_bytes()));
                let resolutions = Arc::clone(&resolutions);
                completion.on_resolve(move |_| {
                    resolutions.fetch_add(1, Ordering::SeqCst);
                });
                completion
            })
            .collect();

        a.shutdown();
        for completion in &completions {
            assert_eq!(completion.resolved().await, Err(DispatchError::Cancelled));
        }
        a.stopped().await.unwrap();

        assert_eq!(resolutions.load(Ordering::SeqCst), 10);
        assert_eq!(a.stats().total_cancelled.load(Ordering::Relaxed), 10);

        cluster.shutdown().await;
    }

    /// A submission arriving after shutdown resolves Cancelled through the
    /// handle, never as a synchronous error.
    #[tokio::test(start_paused = true)]
    async fn test_submission_after_stop_is_cancelled() {
        let mut cluster = LocalCluster::new();
        let a = cluster.spawn_node(NodeId::new(1), config());

        a.shutdown();
        a.stopped().await.unwrap();

        let completion = a.submit(NodeId::new(1), Bytes::from_static(b"late"));
        assert_eq!(completion.resolved().await, Err(DispatchError::Cancelled));

        cluster.shutdown().await;
    }

    /// A response that arrives during the grace period still completes its
    /// request; only what remains at the deadline is cancelled.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_in_flight_work_finishes_during_grace() {
        let mut cluster = LocalCluster::new();
        let grace_config = DispatchConfig {
            shutdown_grace: Duration::from_secs(5),
            ..config()
        };
        let a = cluster.spawn_node(NodeId::new(1), grace_config.clone());
        // the echo answer comes back while node 1 is draining
        cluster.spawn_node(NodeId::new(2), grace_config);

        let completion = a.submit(NodeId::new(2), Bytes::from_static(b"ping"));
        a.shutdown();

        let response = completion.resolved().await.unwrap();
        assert_eq!(&response.payload[..], b"ping");
        a.stopped().await.unwrap();

        cluster.shutdown().await;
    }

    /// Shutting down an idle node stops promptly without burning the full
    /// grace period.
    #[tokio::test]
    async fn test_idle_node_stops_promptly() {
        let mut cluster = LocalCluster::new();
        let a = cluster.spawn_node(
            NodeId::new(1),
            DispatchConfig {
                shutdown_grace: Duration::from_secs(60),
                ..config()
            },
        );

        a.shutdown();
        // would hang for a minute if drain waited out the grace period
        tokio::time::timeout(Duration::from_secs(5), a.stopped())
            .await
            .expect("drain of an idle node should not wait for the grace deadline")
            .unwrap();

        cluster.shutdown().await;
    }
}
