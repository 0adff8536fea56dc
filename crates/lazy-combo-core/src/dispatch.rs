//! UI-context dispatch for results produced on worker threads.
//!
//! Widget state is single-threaded: it belongs to the UI context, the thread
//! that owns the widget and runs its event loop. Work done elsewhere reaches
//! that state in one of two ways:
//!
//! 1. [`UiDispatcher::post`] queues an arbitrary closure. The UI loop runs it
//!    on its next call to [`UiContext::process_pending`].
//!
//! 2. [`Mailbox`] is a single-slot, generation-stamped box for values where
//!    only the newest one matters (a lookup's candidate list). A newer posting
//!    replaces an older pending one and postings from superseded generations
//!    are dropped, both on arrival and on drain.
//!
//! # Example
//!
//! ```
//! use lazy_combo_core::dispatch::UiContext;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! let ui = UiContext::new();
//! let dispatcher = ui.dispatcher();
//! let ran = Arc::new(AtomicBool::new(false));
//!
//! let ran_clone = ran.clone();
//! std::thread::spawn(move || {
//!     dispatcher.post(move || ran_clone.store(true, Ordering::SeqCst)).unwrap();
//! })
//! .join()
//! .unwrap();
//!
//! assert!(!ran.load(Ordering::SeqCst));
//! assert_eq!(ui.process_pending(), 1);
//! assert!(ran.load(Ordering::SeqCst));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use parking_lot::Mutex;

use crate::error::DispatchError;
use crate::logging::targets;
use crate::thread_check::ThreadAffinity;

/// Global invocation counter for unique IDs.
static NEXT_INVOCATION_ID: AtomicU64 = AtomicU64::new(1);

/// A type-erased closure waiting to run on the UI context.
pub struct QueuedInvocation {
    id: u64,
    invoke: Box<dyn FnOnce() + Send>,
}

impl QueuedInvocation {
    /// Create a new queued invocation.
    pub fn new<F>(invoke: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: NEXT_INVOCATION_ID.fetch_add(1, Ordering::Relaxed),
            invoke: Box::new(invoke),
        }
    }

    /// The unique id of this invocation.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Execute the invocation.
    pub fn execute(self) {
        (self.invoke)();
    }
}

impl fmt::Debug for QueuedInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedInvocation").field("id", &self.id).finish()
    }
}

/// The receiving end of UI-context dispatch.
///
/// Owned by the UI thread. Dropping it disconnects every [`UiDispatcher`].
pub struct UiContext {
    sender: Sender<QueuedInvocation>,
    receiver: Receiver<QueuedInvocation>,
    affinity: ThreadAffinity,
}

impl UiContext {
    /// Create a UI context bound to the current thread.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            affinity: ThreadAffinity::current(),
        }
    }

    /// Get a cloneable, `Send` handle for posting work to this context.
    pub fn dispatcher(&self) -> UiDispatcher {
        UiDispatcher {
            sender: self.sender.clone(),
            affinity: self.affinity,
        }
    }

    /// The thread this context belongs to.
    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    /// Number of invocations waiting to run.
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Check if there are any pending invocations.
    pub fn has_pending(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Run every invocation that was queued before this call.
    ///
    /// Invocations posted while draining wait for the next call, so a closure
    /// that re-posts itself cannot starve the UI loop.
    ///
    /// Returns the number of invocations executed.
    pub fn process_pending(&self) -> usize {
        self.affinity.debug_assert_same_thread();

        let count = self.receiver.len();
        let mut executed = 0;
        for _ in 0..count {
            match self.receiver.try_recv() {
                Ok(invocation) => {
                    tracing::trace!(target: targets::DISPATCH, id = invocation.id(), "running queued invocation");
                    invocation.execute();
                    executed += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        executed
    }
}

impl Default for UiContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiContext")
            .field("pending", &self.pending_count())
            .field("affinity", &self.affinity)
            .finish()
    }
}

/// A handle for posting closures to a [`UiContext`] from any thread.
#[derive(Clone)]
pub struct UiDispatcher {
    sender: Sender<QueuedInvocation>,
    affinity: ThreadAffinity,
}

impl UiDispatcher {
    /// Queue a closure to run on the UI context.
    ///
    /// Returns the invocation id, or [`DispatchError::ContextDropped`] if the
    /// UI context no longer exists.
    pub fn post<F>(&self, invoke: F) -> Result<u64, DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        let invocation = QueuedInvocation::new(invoke);
        let id = invocation.id();
        self.sender.send(invocation).map_err(|_| {
            tracing::debug!(target: targets::DISPATCH, id, "UI context gone, dropping invocation");
            DispatchError::ContextDropped
        })?;
        Ok(id)
    }

    /// Check whether the caller is already on the UI context.
    pub fn is_ui_thread(&self) -> bool {
        self.affinity.is_same_thread()
    }
}

impl fmt::Debug for UiDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiDispatcher")
            .field("affinity", &self.affinity)
            .finish()
    }
}

/// A value posted to a [`Mailbox`], stamped with the generation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posted<T> {
    /// The generation of the producer.
    pub generation: u64,
    /// The posted value.
    pub value: T,
}

/// A single-slot, latest-wins mailbox.
///
/// The owner advances the mailbox's generation whenever it issues new work.
/// Only postings from the current generation survive: older ones are rejected
/// by [`post`](Self::post) and discarded by [`take`](Self::take) if the
/// generation moved on while they were waiting.
pub struct Mailbox<T> {
    slot: Mutex<Option<Posted<T>>>,
    current: AtomicU64,
}

impl<T> Mailbox<T> {
    /// Create an empty mailbox at generation 0.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            current: AtomicU64::new(0),
        }
    }

    /// The generation currently accepted.
    pub fn generation(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Move to a newer generation, discarding any pending older posting.
    ///
    /// Generations never go backwards; an older value is ignored.
    pub fn advance(&self, generation: u64) {
        let previous = self.current.fetch_max(generation, Ordering::AcqRel);
        if generation > previous {
            let mut slot = self.slot.lock();
            if slot.as_ref().is_some_and(|p| p.generation < generation) {
                *slot = None;
            }
        }
    }

    /// Post a value produced by `generation`.
    ///
    /// Returns `false` if the posting was discarded because a newer generation
    /// has been issued or a newer posting is already waiting.
    pub fn post(&self, generation: u64, value: T) -> bool {
        let mut slot = self.slot.lock();
        if generation < self.current.load(Ordering::Acquire) {
            tracing::trace!(target: targets::DISPATCH, generation, "stale posting discarded on arrival");
            return false;
        }
        if slot.as_ref().is_some_and(|p| p.generation > generation) {
            return false;
        }
        *slot = Some(Posted { generation, value });
        true
    }

    /// Take the pending posting if it still belongs to the current generation.
    pub fn take(&self) -> Option<Posted<T>> {
        let posted = self.slot.lock().take()?;
        if posted.generation < self.current.load(Ordering::Acquire) {
            tracing::trace!(
                target: targets::DISPATCH,
                generation = posted.generation,
                "stale posting discarded on drain"
            );
            return None;
        }
        Some(posted)
    }

    /// Check whether a posting is waiting.
    pub fn has_pending(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("generation", &self.generation())
            .field("has_pending", &self.has_pending())
            .finish()
    }
}

static_assertions::assert_impl_all!(UiDispatcher: Send, Sync, Clone);
static_assertions::assert_impl_all!(Mailbox<Vec<String>>: Send, Sync);
