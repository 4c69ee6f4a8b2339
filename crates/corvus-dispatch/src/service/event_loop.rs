//! The consensus event loop.
//!
//! A single tokio task that exclusively owns the pending table and the
//! correlation id allocator. One iteration, while running:
//!
//! 1. Dequeue everything currently available from the inbound queue.
//! 2. Classify each message: a response is matched against the pending
//!    table (removal and completion are one atomic step on this task); a
//!    request is wrapped in an envelope and dispatched to protocol logic.
//! 3. Sweep for timeouts.
//! 4. Process caller submissions: allocate an id, register, transmit.
//!
//! A shutdown signal moves the loop to Draining: submissions are refused
//! with `Cancelled`, in-flight work may still complete until the grace
//! deadline, then every remaining entry fails with `Cancelled` and the loop
//! stops.

use crate::domain::completion::CompletionHandle;
use crate::domain::config::DispatchConfig;
use crate::domain::correlation::CorrelationIdAllocator;
use crate::domain::envelope::{InboundRequest, InboundResponse, OutboundRequest, RequestEnvelope};
use crate::domain::error::{DispatchError, DispatchResult};
use crate::domain::message::{PeerMessage, ResponseFrame, ResponseOutcome, INTERNAL_ERROR_CODE};
use crate::domain::pending::PendingRequestTable;
use crate::ports::outbound::{PeerTransport, RequestHandler};
use crate::queue::InboundReceiver;
use crate::service::sweeper::TimeoutSweeper;
use crate::service::{Command, DispatchStats, ResponseReady};
use bytes::Bytes;
use shared_types::{NodeId, PROTOCOL_VERSION};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// Loop lifecycle. Stopped is terminal.
#[derive(Debug, Clone, Copy)]
enum LoopState {
    Running,
    Draining { deadline: Instant },
    Stopped,
}

/// Single-threaded driver owning all correlation state.
///
/// Constructed by [`DispatchService::start`](crate::service::DispatchService)
/// and consumed by [`run`](Self::run) on its own task. Nothing here is
/// locked: exclusivity comes from ownership.
pub struct ConsensusEventLoop<T, H> {
    config: DispatchConfig,
    transport: Arc<T>,
    handler: Arc<H>,
    table: PendingRequestTable,
    allocator: CorrelationIdAllocator,
    sweeper: TimeoutSweeper,
    inbound: InboundReceiver,
    commands: mpsc::UnboundedReceiver<Command>,
    responses_rx: mpsc::UnboundedReceiver<ResponseReady>,
    responses_tx: mpsc::UnboundedSender<ResponseReady>,
    stats: Arc<DispatchStats>,
    state: LoopState,
    commands_open: bool,
    inbound_open: bool,
    /// Inbound requests handed to protocol logic whose responses have not
    /// yet come back through the response channel.
    inflight_inbound: usize,
}

impl<T, H> ConsensusEventLoop<T, H>
where
    T: PeerTransport + 'static,
    H: RequestHandler + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: DispatchConfig,
        transport: Arc<T>,
        handler: Arc<H>,
        inbound: InboundReceiver,
        commands: mpsc::UnboundedReceiver<Command>,
        stats: Arc<DispatchStats>,
    ) -> Self {
        let sweeper = TimeoutSweeper::new(config.request_timeout);
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        Self {
            config,
            transport,
            handler,
            table: PendingRequestTable::new(),
            allocator: CorrelationIdAllocator::new(),
            sweeper,
            inbound,
            commands,
            responses_rx,
            responses_tx,
            stats,
            state: LoopState::Running,
            commands_open: true,
            inbound_open: true,
            inflight_inbound: 0,
        }
    }

    /// Drive the loop until it stops.
    ///
    /// Returns `Err` only for loop-fatal invariant violations (correlation
    /// space exhausted, duplicate id in the table); every pending handle is
    /// failed before the error propagates to the process owner.
    pub async fn run(mut self) -> DispatchResult<()> {
        info!(
            request_timeout_ms = self.config.request_timeout.as_millis() as u64,
            shutdown_grace_ms = self.config.shutdown_grace.as_millis() as u64,
            "dispatch event loop started"
        );
        let mut tick = time::interval(self.config.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let result = loop {
            match self.state {
                LoopState::Running => {
                    tokio::select! {
                        biased;
                        command = self.commands.recv(), if self.commands_open => {
                            match command {
                                Some(command) => {
                                    if let Err(fatal) = self.handle_command(command).await {
                                        break Err(fatal);
                                    }
                                }
                                None => {
                                    self.commands_open = false;
                                    self.begin_drain("all dispatch handles dropped");
                                }
                            }
                        }
                        ready = self.responses_rx.recv() => {
                            if let Some(ready) = ready {
                                self.forward_response(ready).await;
                            }
                        }
                        message = self.inbound.recv(), if self.inbound_open => {
                            match message {
                                Some(message) => self.handle_message(message).await,
                                None => {
                                    self.inbound_open = false;
                                    debug!("inbound queue closed");
                                }
                            }
                        }
                        _ = tick.tick() => {}
                    }
                    if let Err(fatal) = self.finish_iteration().await {
                        break Err(fatal);
                    }
                }
                LoopState::Draining { deadline } => {
                    if self.table.is_empty() && self.inflight_inbound == 0 {
                        info!("drain complete, all in-flight work finished");
                        self.state = LoopState::Stopped;
                        continue;
                    }
                    if Instant::now() >= deadline {
                        self.fail_remaining();
                        self.state = LoopState::Stopped;
                        continue;
                    }
                    tokio::select! {
                        biased;
                        command = self.commands.recv(), if self.commands_open => {
                            match command {
                                Some(command) => {
                                    if let Err(fatal) = self.handle_command(command).await {
                                        break Err(fatal);
                                    }
                                }
                                None => self.commands_open = false,
                            }
                        }
                        ready = self.responses_rx.recv() => {
                            if let Some(ready) = ready {
                                self.forward_response(ready).await;
                            }
                        }
                        message = self.inbound.recv(), if self.inbound_open => {
                            match message {
                                Some(message) => self.handle_message(message).await,
                                None => self.inbound_open = false,
                            }
                        }
                        _ = time::sleep_until(deadline) => {
                            self.fail_remaining();
                            self.state = LoopState::Stopped;
                        }
                    }
                    if matches!(self.state, LoopState::Stopped) {
                        continue;
                    }
                    if let Err(fatal) = self.finish_iteration().await {
                        break Err(fatal);
                    }
                }
                LoopState::Stopped => break Ok(()),
            }
        };

        self.refuse_queued_submissions();
        match &result {
            Ok(()) => info!("dispatch event loop stopped"),
            Err(fatal) => error!(error = %fatal, "dispatch event loop stopped on fatal error"),
        }
        result
    }

    /// Finish the iteration after whichever wakeup fired: drain everything
    /// already queued (inbound first), sweep, then process submissions.
    async fn finish_iteration(&mut self) -> DispatchResult<()> {
        while let Some(message) = self.inbound.try_recv() {
            self.handle_message(message).await;
        }
        while let Ok(ready) = self.responses_rx.try_recv() {
            self.forward_response(ready).await;
        }
        self.sweep();
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.handle_command(command).await?,
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if self.commands_open {
                        self.commands_open = false;
                        self.begin_drain("all dispatch handles dropped");
                    }
                    break;
                }
            }
        }
        Ok(())
    }

    async fn handle_command(&mut self, command: Command) -> DispatchResult<()> {
        match command {
            Command::Submit {
                destination,
                payload,
                completion,
            } => self.handle_submit(destination, payload, completion).await,
            Command::Shutdown => {
                self.begin_drain("shutdown signal received");
                Ok(())
            }
        }
    }

    async fn handle_submit(
        &mut self,
        destination: NodeId,
        payload: Bytes,
        completion: CompletionHandle<InboundResponse>,
    ) -> DispatchResult<()> {
        if !matches!(self.state, LoopState::Running) {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            completion.fail(DispatchError::Cancelled);
            return Ok(());
        }
        let correlation_id = match self.allocator.allocate(&self.table) {
            Ok(id) => id,
            Err(fatal) => {
                completion.fail(fatal.clone());
                self.fail_remaining();
                return Err(fatal);
            }
        };
        let request = OutboundRequest::new(
            correlation_id,
            PROTOCOL_VERSION,
            payload,
            destination,
            completion,
        );
        self.admit(RequestEnvelope::Outbound(request)).await
    }

    /// Admit a freshly constructed envelope into the loop.
    async fn admit(&mut self, envelope: RequestEnvelope) -> DispatchResult<()> {
        trace!(envelope = %envelope, "admitting request envelope");
        match envelope {
            RequestEnvelope::Outbound(request) => {
                let correlation_id = request.correlation_id();
                let destination = request.destination();
                let frame = request.frame();
                let completion = request.completion().clone();
                if let Err(fatal) = self.table.insert(request) {
                    completion.fail(fatal.clone());
                    self.fail_remaining();
                    return Err(fatal);
                }
                self.stats.total_submitted.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    destination = %destination,
                    "registered outbound request"
                );
                if let Err(send_error) = self.transport.send_request(destination, frame).await {
                    if let Some(request) = self.table.remove_if_present(correlation_id) {
                        self.stats.total_unreachable.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            correlation_id = %correlation_id,
                            destination = %destination,
                            error = %send_error,
                            "outbound send failed"
                        );
                        request.completion().fail(DispatchError::NodeUnreachable {
                            node: destination,
                            reason: send_error.to_string(),
                        });
                    }
                }
                Ok(())
            }
            RequestEnvelope::Inbound(request) => {
                self.dispatch_inbound(request);
                Ok(())
            }
        }
    }

    /// Hand an inbound request to protocol logic on its own task and route
    /// the eventual response back through the loop.
    fn dispatch_inbound(&mut self, request: InboundRequest) {
        self.stats
            .total_inbound_requests
            .fetch_add(1, Ordering::Relaxed);
        self.inflight_inbound += 1;

        let sender = request.sender();
        let correlation_id = request.correlation_id();
        let protocol_version = request.protocol_version();
        let responses_tx = self.responses_tx.clone();
        request.completion().on_resolve(move |outcome| {
            let frame = match outcome {
                Ok(response) => response.frame(),
                Err(failure) => ResponseFrame {
                    correlation_id,
                    protocol_version,
                    outcome: ResponseOutcome::Error {
                        code: INTERNAL_ERROR_CODE,
                        message: failure.to_string(),
                    },
                },
            };
            let _ = responses_tx.send(ResponseReady {
                destination: sender,
                frame,
            });
        });

        debug!(
            correlation_id = %correlation_id,
            sender = %sender,
            "dispatching inbound request to protocol logic"
        );
        let handler = Arc::clone(&self.handler);
        tokio::spawn(async move { handler.handle_request(request).await });
    }

    async fn handle_message(&mut self, message: PeerMessage) {
        match message {
            PeerMessage::Response { sender, frame } => self.handle_response(sender, frame),
            PeerMessage::Request { sender, frame } => {
                if !matches!(self.state, LoopState::Running) {
                    debug!(
                        correlation_id = %frame.correlation_id,
                        sender = %sender,
                        "discarding inbound request while draining"
                    );
                    return;
                }
                let request = InboundRequest::new(
                    sender,
                    frame.correlation_id,
                    frame.protocol_version,
                    frame.payload,
                );
                // inbound admission cannot hit the fatal outbound paths
                let _ = self.admit(RequestEnvelope::Inbound(request)).await;
            }
        }
    }

    /// Match a response against the pending table; removal and completion
    /// happen together, on this task only.
    fn handle_response(&mut self, sender: NodeId, frame: ResponseFrame) {
        let ResponseFrame {
            correlation_id,
            protocol_version,
            outcome,
        } = frame;
        let Some(request) = self.table.remove_if_present(correlation_id) else {
            // expected race: the entry already timed out, was cancelled, or
            // this is a duplicate delivery
            self.stats
                .total_unknown_responses
                .fetch_add(1, Ordering::Relaxed);
            debug!(
                correlation_id = %correlation_id,
                source = %sender,
                "discarding response with no pending entry"
            );
            return;
        };
        match outcome {
            ResponseOutcome::Success(payload) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    source = %sender,
                    "matched response to pending request"
                );
                request.completion().complete(InboundResponse {
                    source: sender,
                    correlation_id,
                    protocol_version,
                    payload,
                });
            }
            ResponseOutcome::Error { code, message } => {
                self.stats
                    .total_protocol_errors
                    .fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    source = %sender,
                    code,
                    "peer answered with protocol error"
                );
                request
                    .completion()
                    .fail(DispatchError::Protocol { code, message });
            }
        }
    }

    /// Send a locally produced response back to the requesting peer.
    async fn forward_response(&mut self, ready: ResponseReady) {
        self.inflight_inbound = self.inflight_inbound.saturating_sub(1);
        if let Err(send_error) = self
            .transport
            .send_response(ready.destination, ready.frame)
            .await
        {
            // the inbound side is already resolved; nothing left to fail
            warn!(
                destination = %ready.destination,
                error = %send_error,
                "failed to send response"
            );
        }
    }

    fn sweep(&mut self) {
        let swept = self.sweeper.sweep(&mut self.table, Instant::now());
        if swept > 0 {
            self.stats.total_timeouts.fetch_add(swept, Ordering::Relaxed);
        }
    }

    fn begin_drain(&mut self, reason: &str) {
        if matches!(self.state, LoopState::Running) {
            let deadline = Instant::now() + self.config.shutdown_grace;
            info!(
                reason,
                pending = self.table.len(),
                inflight_inbound = self.inflight_inbound,
                grace_ms = self.config.shutdown_grace.as_millis() as u64,
                "dispatch loop draining"
            );
            self.state = LoopState::Draining { deadline };
        }
    }

    /// Fail every remaining pending entry with `Cancelled`, exactly once
    /// each (`drain_all` empties the table, so no later path can see them).
    fn fail_remaining(&mut self) {
        let drained = self.table.drain_all();
        if !drained.is_empty() {
            warn!(count = drained.len(), "cancelling pending requests on shutdown");
        }
        for request in drained {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            request.completion().fail(DispatchError::Cancelled);
        }
    }

    /// Submissions still sitting in the command channel when the loop stops
    /// must also reach their terminal event.
    fn refuse_queued_submissions(&mut self) {
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            if let Command::Submit { completion, .. } = command {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                completion.fail(DispatchError::Cancelled);
            }
        }
    }
}
