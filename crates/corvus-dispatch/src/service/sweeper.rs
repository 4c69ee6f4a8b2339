//! Timeout sweeping.

use crate::domain::error::DispatchError;
use crate::domain::pending::PendingRequestTable;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Fails pending entries whose age has reached the configured timeout.
///
/// Invoked once per event-loop iteration rather than from a separate timer
/// thread, so sweep granularity is bounded by iteration latency. Staleness
/// is computed from each entry's immutable creation time; no per-entry
/// activity tracking exists.
pub(crate) struct TimeoutSweeper {
    timeout: Duration,
}

impl TimeoutSweeper {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Remove and fail every entry created at or before `now - timeout`.
    ///
    /// Returns the number of entries failed. Removal goes through
    /// `remove_if_present`, so an entry that a response matched in the same
    /// iteration is simply not found here.
    pub(crate) fn sweep(&self, table: &mut PendingRequestTable, now: Instant) -> u64 {
        let Some(deadline) = now.checked_sub(self.timeout) else {
            return 0;
        };
        let mut swept = 0;
        for id in table.entries_older_than(deadline) {
            if let Some(request) = table.remove_if_present(id) {
                warn!(
                    correlation_id = %id,
                    destination = %request.destination(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "pending request timed out"
                );
                request.completion().fail(DispatchError::Timeout {
                    timeout: self.timeout,
                });
                swept += 1;
            }
        }
        swept
    }
}
