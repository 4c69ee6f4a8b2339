//! Pending request table.
//!
//! The authoritative record of outstanding outbound requests awaiting a
//! response, a timeout, or shutdown.

use crate::domain::correlation::CorrelationId;
use crate::domain::envelope::OutboundRequest;
use crate::domain::error::{DispatchError, DispatchResult};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::time::Instant;

/// Map from correlation id to the outbound envelope awaiting its response.
///
/// ## Thread Safety
///
/// Deliberately unsynchronized: the table is owned by the event loop task
/// and every operation here is called from that task only. Cross-thread
/// submission is mediated through the command channel, never by touching
/// the table directly.
///
/// ## Removal discipline
///
/// The response-matching, timeout and shutdown paths all funnel through
/// [`remove_if_present`](Self::remove_if_present) (or
/// [`drain_all`](Self::drain_all)), so a given id is removed by exactly one
/// of them; whichever comes second sees "not present" instead of
/// double-removing — and therefore never resolves a completion twice.
#[derive(Default)]
pub struct PendingRequestTable {
    entries: HashMap<CorrelationId, OutboundRequest>,
}

impl PendingRequestTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register an outbound request under its correlation id.
    ///
    /// An occupied slot means the allocator's uniqueness invariant broke;
    /// the existing entry is left untouched and the caller decides how to
    /// surface the violation.
    pub fn insert(&mut self, request: OutboundRequest) -> DispatchResult<()> {
        match self.entries.entry(request.correlation_id()) {
            Entry::Occupied(_) => Err(DispatchError::DuplicateCorrelation(
                request.correlation_id(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(request);
                Ok(())
            }
        }
    }

    /// Remove and return the entry for `id`, if it is still pending.
    pub fn remove_if_present(&mut self, id: CorrelationId) -> Option<OutboundRequest> {
        self.entries.remove(&id)
    }

    /// Remove and return every entry, for shutdown.
    pub fn drain_all(&mut self) -> Vec<OutboundRequest> {
        self.entries.drain().map(|(_, request)| request).collect()
    }

    /// Ids of entries created at or before `deadline`, for timeout scans.
    #[must_use]
    pub fn entries_older_than(&self, deadline: Instant) -> Vec<CorrelationId> {
        self.entries
            .iter()
            .filter(|(_, request)| request.created_at() <= deadline)
            .map(|(id, _)| *id)
            .collect()
    }

    #[must_use]
    pub fn contains(&self, id: CorrelationId) -> bool {
        self.entries.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
