//! # Corvus Node Runtime
//!
//! Composition root for the Corvus node: adapters implementing the dispatch
//! core's ports, environment-derived configuration, and the wiring that runs
//! several dispatch loops as an in-process cluster.
//!
//! ## Modular Structure
//!
//! - `adapters/` - Port implementations (loopback transport)
//! - `handlers/` - Protocol-logic implementations (echo)
//! - `cluster`   - Local cluster wiring
//! - `config`    - Runtime configuration from environment variables

pub mod adapters;
pub mod cluster;
pub mod config;
pub mod handlers;

pub use adapters::{LoopbackNetwork, LoopbackTransport};
pub use cluster::LocalCluster;
pub use config::RuntimeConfig;
pub use handlers::EchoHandler;
