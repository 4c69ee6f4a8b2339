//! Local cluster wiring.
//!
//! Spins up one dispatch loop per node over a shared [`LoopbackNetwork`],
//! registers routes, and tears everything down in order on shutdown.

use crate::adapters::LoopbackNetwork;
use crate::handlers::EchoHandler;
use corvus_dispatch::{
    DispatchApi, DispatchConfig, DispatchDependencies, DispatchHandle, DispatchService,
    RequestHandler,
};
use shared_types::NodeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// A set of in-process nodes wired through loopback transport.
pub struct LocalCluster {
    network: Arc<LoopbackNetwork>,
    nodes: HashMap<NodeId, DispatchHandle>,
}

impl LocalCluster {
    #[must_use]
    pub fn new() -> Self {
        Self {
            network: LoopbackNetwork::new(),
            nodes: HashMap::new(),
        }
    }

    /// Start a node answering requests with [`EchoHandler`].
    pub fn spawn_node(&mut self, node: NodeId, config: DispatchConfig) -> DispatchHandle {
        self.spawn_node_with_handler(node, config, Arc::new(EchoHandler))
    }

    /// Start a node with custom protocol logic.
    pub fn spawn_node_with_handler<H>(
        &mut self,
        node: NodeId,
        config: DispatchConfig,
        handler: Arc<H>,
    ) -> DispatchHandle
    where
        H: RequestHandler + 'static,
    {
        let transport = Arc::new(self.network.transport_for(node));
        let handle = DispatchService::start(DispatchDependencies {
            config,
            transport,
            handler,
        });
        self.network.register(node, handle.inbound_queue());
        self.nodes.insert(node, handle.clone());
        info!(node = %node, "node started");
        handle
    }

    /// Handle of a running node.
    #[must_use]
    pub fn handle(&self, node: NodeId) -> Option<&DispatchHandle> {
        self.nodes.get(&node)
    }

    /// Shared loopback network, for callers that manipulate routes directly
    /// (fault injection in tests, membership changes).
    #[must_use]
    pub fn network(&self) -> &Arc<LoopbackNetwork> {
        &self.network
    }

    /// Ids of all running nodes, in ascending order.
    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<_> = self.nodes.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Shut every node down and wait for their loops to stop.
    ///
    /// Routes are cut first so no node keeps receiving while draining, then
    /// every loop gets the shutdown signal and is awaited.
    pub async fn shutdown(&mut self) {
        for node in self.node_ids() {
            self.network.unregister(node);
        }
        for handle in self.nodes.values() {
            handle.shutdown();
        }
        for (node, handle) in self.nodes.drain() {
            if let Err(error) = handle.stopped().await {
                tracing::error!(node = %node, error = %error, "node stopped abnormally");
            } else {
                info!(node = %node, "node stopped");
            }
        }
    }
}

impl Default for LocalCluster {
    fn default() -> Self {
        Self::new()
    }
}
