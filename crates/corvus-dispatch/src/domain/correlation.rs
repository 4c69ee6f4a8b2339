//! Correlation ids and their allocator.
//!
//! A correlation id links an outbound request to the response that will
//! eventually come back for it. Ids are unique only among *currently
//! pending* requests; once an entry leaves the pending table its id may be
//! reissued after the allocator wraps.

use crate::domain::error::{DispatchError, DispatchResult};
use crate::domain::pending::PendingRequestTable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer tag linking an outbound request to its eventual response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u32);

impl CorrelationId {
    /// Reserved id, never issued by the allocator. Useful as a sentinel for
    /// uncorrelated one-way messages.
    pub const RESERVED: CorrelationId = CorrelationId(0);

    /// Reconstruct an id from its wire form.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw wire form.
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues correlation ids for outbound requests.
///
/// Ids increase monotonically and wrap back to 1 past `u32::MAX`; the
/// reserved id 0 is never issued. After wraparound an id could still be live
/// under an extremely long-lived pending request, so allocation consults the
/// pending table and skips live ids rather than silently overwriting their
/// entries. If every id in the space is pending the allocator reports
/// [`DispatchError::CorrelationSpaceExhausted`], which the event loop treats
/// as fatal.
///
/// ## Thread Safety
///
/// Not synchronized. The allocator is owned by the event loop task and must
/// only be called there (single-writer rule).
#[derive(Debug)]
pub struct CorrelationIdAllocator {
    next: u32,
}

impl CorrelationIdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocate the next id not currently pending.
    ///
    /// Probes at most `pending.len() + 1` candidates; among that many
    /// distinct ids at least one must be free, so the error branch is only
    /// reachable when the entire id space is live.
    pub fn allocate(&mut self, pending: &PendingRequestTable) -> DispatchResult<CorrelationId> {
        let probes = pending.len().saturating_add(1);
        for _ in 0..probes {
            let candidate = CorrelationId(self.next);
            self.next = match self.next.checked_add(1) {
                Some(next) => next,
                None => 1,
            };
            if !pending.contains(candidate) {
                return Ok(candidate);
            }
        }
        Err(DispatchError::CorrelationSpaceExhausted {
            pending: pending.len(),
        })
    }
}

impl Default for CorrelationIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
