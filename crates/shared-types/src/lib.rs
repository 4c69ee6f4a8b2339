//! # Shared Types Crate
//!
//! Cross-crate value objects for the Corvus node runtime.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: types that cross crate boundaries (peer
//!   identity, protocol versioning) are defined here and nowhere else.
//! - **Plain value objects**: no I/O, no async, no locking — just data.

pub mod node;

pub use node::NodeId;

/// Protocol version stamped on every locally created envelope.
pub const PROTOCOL_VERSION: u16 = 1;
