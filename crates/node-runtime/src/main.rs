//! Corvus node entry point.
//!
//! Starts a small in-process cluster over loopback transport, runs one round
//! of cross-node requests to show the dispatch layer working end to end,
//! then waits for Ctrl-C and shuts down gracefully.

use anyhow::{Context, Result};
use bytes::Bytes;
use node_runtime::{LocalCluster, RuntimeConfig};
use shared_types::NodeId;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use corvus_dispatch::DispatchApi;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = RuntimeConfig::from_env();
    config
        .dispatch
        .validate()
        .context("invalid dispatch configuration")?;
    info!(
        nodes = config.node_count,
        request_timeout_ms = config.dispatch.request_timeout.as_millis() as u64,
        "starting corvus cluster"
    );

    let mut cluster = LocalCluster::new();
    for raw in 1..=config.node_count {
        cluster.spawn_node(NodeId::new(raw), config.dispatch.clone());
    }

    demo_round(&cluster).await;

    info!("demo round complete, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    cluster.shutdown().await;
    info!("cluster stopped");
    Ok(())
}

/// Every node sends one request to every other node and logs the outcome.
async fn demo_round(cluster: &LocalCluster) {
    let ids = cluster.node_ids();
    let mut in_flight = Vec::new();
    for &from in &ids {
        let Some(handle) = cluster.handle(from) else {
            continue;
        };
        for &to in &ids {
            if from == to {
                continue;
            }
            let payload = Bytes::from(format!("ping {from}->{to}").into_bytes());
            in_flight.push((from, to, handle.submit(to, payload)));
        }
    }
    for (from, to, completion) in in_flight {
        match completion.resolved().await {
            Ok(response) => info!(
                from = %from,
                to = %to,
                payload_len = response.payload.len(),
                "response received"
            ),
            Err(error) => warn!(from = %from, to = %to, error = %error, "request failed"),
        }
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;
    Ok(())
}
