//! Dispatch service: the event loop plus the handle callers hold.
//!
//! [`DispatchService::start`] spawns the [`ConsensusEventLoop`] on its own
//! task and returns a cloneable [`DispatchHandle`]. The handle is the only
//! object other threads ever touch; everything it does is a message into
//! the loop.

mod event_loop;
mod sweeper;


pub use event_loop::ConsensusEventLoop;

use crate::domain::completion::CompletionHandle;
use crate::domain::config::DispatchConfig;
use crate::domain::envelope::InboundResponse;
use crate::domain::error::{DispatchError, DispatchResult};
use crate::domain::message::ResponseFrame;
use crate::ports::inbound::DispatchApi;
use crate::ports::outbound::{PeerTransport, RequestHandler};
use crate::queue::{inbound_queue, InboundQueue};
use bytes::Bytes;
use shared_types::NodeId;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

/// Caller-side messages into the event loop.
pub(crate) enum Command {
    Submit {
        destination: NodeId,
        payload: Bytes,
        completion: CompletionHandle<InboundResponse>,
    },
    Shutdown,
}

/// A locally produced response ready to be sent back to its requester.
/// Travels on the loop's internal channel so the transport is only ever
/// driven from the loop task.
pub(crate) struct ResponseReady {
    pub(crate) destination: NodeId,
    pub(crate) frame: ResponseFrame,
}

/// Counters for the dispatch layer.
#[derive(Debug, Default)]
pub struct DispatchStats {
    /// Outbound requests registered in the pending table.
    pub total_submitted: AtomicU64,
    /// Requests completed by a matched success response.
    pub total_completed: AtomicU64,
    /// Requests failed by a matched protocol-error response.
    pub total_protocol_errors: AtomicU64,
    /// Requests failed by the timeout sweeper.
    pub total_timeouts: AtomicU64,
    /// Requests failed with `Cancelled` (shutdown or refused submission).
    pub total_cancelled: AtomicU64,
    /// Requests failed because the transport could not send.
    pub total_unreachable: AtomicU64,
    /// Responses discarded for lack of a pending entry.
    pub total_unknown_responses: AtomicU64,
    /// Inbound requests dispatched to protocol logic.
    pub total_inbound_requests: AtomicU64,
}

/// Dependencies for [`DispatchService::start`].
pub struct DispatchDependencies<T, H> {
    pub config: DispatchConfig,
    pub transport: Arc<T>,
    pub handler: Arc<H>,
}

/// Entry point of the dispatch core.
pub struct DispatchService;

impl DispatchService {
    /// Spawn the event loop and return the handle callers use.
    ///
    /// The loop runs until [`DispatchHandle::shutdown`] (or the last handle
    /// being dropped) drains it, or a fatal invariant violation stops it.
    pub fn start<T, H>(deps: DispatchDependencies<T, H>) -> DispatchHandle
    where
        T: PeerTransport + 'static,
        H: RequestHandler + 'static,
    {
        let (inbound, inbound_rx) = inbound_queue(deps.config.inbound_queue_capacity);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let stats = Arc::new(DispatchStats::default());

        let event_loop = ConsensusEventLoop::new(
            deps.config,
            deps.transport,
            deps.handler,
            inbound_rx,
            command_rx,
            Arc::clone(&stats),
        );
        let join = tokio::spawn(async move {
            let result = event_loop.run().await;
            if let Err(ref fatal) = result {
                error!(error = %fatal, "dispatch loop terminated abnormally");
            }
            result
        });

        DispatchHandle {
            commands: command_tx,
            inbound,
            stats,
            join: Arc::new(parking_lot::Mutex::new(Some(join))),
        }
    }
}

/// Cloneable handle to a running dispatch loop.
///
/// Safe to share across threads; every operation is a channel send. Once
/// the loop has stopped, submissions resolve immediately with `Cancelled`.
#[derive(Clone)]
pub struct DispatchHandle {
    commands: mpsc::UnboundedSender<Command>,
    inbound: InboundQueue,
    stats: Arc<DispatchStats>,
    join: Arc<parking_lot::Mutex<Option<JoinHandle<DispatchResult<()>>>>>,
}

impl DispatchHandle {
    /// Producer side of the inbound queue, for the network collaborator's
    /// receive threads.
    #[must_use]
    pub fn inbound_queue(&self) -> InboundQueue {
        self.inbound.clone()
    }

    /// Shared counters.
    #[must_use]
    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for the loop to stop and return its final result.
    ///
    /// Idempotent: later calls (and concurrent calls on clones) return
    /// `Ok(())` once the first one has claimed the join handle.
    pub async fn stopped(&self) -> DispatchResult<()> {
        let join = self.join.lock().take();
        match join {
            Some(join) => match join.await {
                Ok(result) => result,
                Err(join_error) if join_error.is_panic() => {
                    std::panic::resume_unwind(join_error.into_panic())
                }
                Err(_) => Err(DispatchError::Cancelled),
            },
            None => Ok(()),
        }
    }
}

impl DispatchApi for DispatchHandle {
    fn submit(&self, destination: NodeId, payload: Bytes) -> CompletionHandle<InboundResponse> {
        let completion = CompletionHandle::new();
        let command = Command::Submit {
            destination,
            payload,
            completion: completion.clone(),
        };
        if self.commands.send(command).is_err() {
            // loop already stopped; the outcome is still asynchronous
            self.stats
                .total_cancelled
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            completion.fail(DispatchError::Cancelled);
        }
        completion
    }

    fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}
