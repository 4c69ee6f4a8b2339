//! Peer node identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a participant node in the cluster.
///
/// A `NodeId` is assigned out of band (static configuration or membership
/// change) and is stable for the lifetime of the node. It is the sole
/// addressing handle the dispatch layer uses for outbound requests and for
/// routing responses back to a request's sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a node id from its raw numeric form.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric form, for adapters that key routing tables by integer.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<NodeId> for u64 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}
