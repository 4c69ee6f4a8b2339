//! Adapters implementing the dispatch core's outbound ports.

pub mod loopback;

pub use loopback::{LoopbackNetwork, LoopbackTransport};
