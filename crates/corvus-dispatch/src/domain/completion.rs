//! Single-assignment completion primitive.
//!
//! Every request envelope carries one of these. Exactly one of
//! [`complete`](CompletionHandle::complete) or
//! [`fail`](CompletionHandle::fail) may ever be called on a handle; any
//! number of observers may block, await, or attach continuations.

use crate::domain::error::DispatchError;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;

/// Outcome a completion handle resolves to.
pub type CompletionResult<T> = Result<T, DispatchError>;

type Continuation<T> = Box<dyn FnOnce(&CompletionResult<T>) + Send>;

enum Slot<T> {
    Pending(Vec<Continuation<T>>),
    Resolved(CompletionResult<T>),
}

struct State<T> {
    slot: Mutex<Slot<T>>,
    resolved: Condvar,
}

/// Thread-safe, single-assignment result slot with observer registration.
///
/// Clones share the same underlying slot. Resolution transitions the slot
/// from pending to resolved exactly once; a second `complete` or `fail` is a
/// programming error and panics rather than silently overwriting the first
/// outcome. Observers attached via [`on_resolve`](Self::on_resolve) run
/// exactly once each, in registration order, on whichever thread performs
/// the resolution (or immediately on the registering thread if the handle is
/// already resolved).
pub struct CompletionHandle<T> {
    state: Arc<State<T>>,
}

impl<T> CompletionHandle<T> {
    /// Create an unresolved handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(State {
                slot: Mutex::new(Slot::Pending(Vec::new())),
                resolved: Condvar::new(),
            }),
        }
    }

    /// Whether the handle has been resolved (successfully or not).
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(&*self.state.slot.lock(), Slot::Resolved(_))
    }
}

impl<T: Clone> CompletionHandle<T> {
    /// Resolve the handle with a success value.
    ///
    /// # Panics
    ///
    /// Panics if the handle is already resolved.
    pub fn complete(&self, value: T) {
        self.resolve(Ok(value));
    }

    /// Resolve the handle with a failure reason.
    ///
    /// # Panics
    ///
    /// Panics if the handle is already resolved.
    pub fn fail(&self, error: DispatchError) {
        self.resolve(Err(error));
    }

    /// Non-blocking peek at the outcome, if resolved.
    #[must_use]
    pub fn result(&self) -> Option<CompletionResult<T>> {
        match &*self.state.slot.lock() {
            Slot::Resolved(result) => Some(result.clone()),
            Slot::Pending(_) => None,
        }
    }

    /// Block the calling thread until the handle resolves.
    ///
    /// For synchronous callers only. The event loop never blocks here: it
    /// only ever produces resolutions, never waits on a handle it owns.
    #[must_use]
    pub fn wait(&self) -> CompletionResult<T> {
        let mut slot = self.state.slot.lock();
        loop {
            if let Slot::Resolved(result) = &*slot {
                return result.clone();
            }
            self.state.resolved.wait(&mut slot);
        }
    }

    /// Attach a continuation invoked exactly once at resolution.
    ///
    /// Continuations run in registration order on the resolving thread; if
    /// the handle is already resolved the continuation runs immediately on
    /// the calling thread.
    pub fn on_resolve<F>(&self, continuation: F)
    where
        F: FnOnce(&CompletionResult<T>) + Send + 'static,
    {
        let immediate = {
            let mut slot = self.state.slot.lock();
            match &mut *slot {
                Slot::Pending(continuations) => {
                    continuations.push(Box::new(continuation));
                    None
                }
                Slot::Resolved(result) => Some((continuation, result.clone())),
            }
        };
        if let Some((continuation, result)) = immediate {
            continuation(&result);
        }
    }

    fn resolve(&self, result: CompletionResult<T>) {
        let continuations = {
            let mut slot = self.state.slot.lock();
            match &mut *slot {
                Slot::Resolved(_) => panic!("completion handle resolved twice"),
                Slot::Pending(continuations) => {
                    let continuations = std::mem::take(continuations);
                    *slot = Slot::Resolved(result.clone());
                    self.state.resolved.notify_all();
                    continuations
                }
            }
        };
        for continuation in continuations {
            continuation(&result);
        }
    }
}

impl<T: Clone + Send + 'static> CompletionHandle<T> {
    /// Await resolution without blocking the runtime.
    ///
    /// The returned future does not borrow the handle, so the handle may be
    /// dropped while the future is pending. If every handle is dropped
    /// before resolution the future resolves to
    /// [`DispatchError::Cancelled`] rather than pending forever.
    pub fn resolved(&self) -> impl std::future::Future<Output = CompletionResult<T>> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.on_resolve(move |result| {
            let _ = tx.send(result.clone());
        });
        async move { rx.await.unwrap_or(Err(DispatchError::Cancelled)) }
    }
}

impl<T> Clone for CompletionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Default for CompletionHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CompletionHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
