//! Lookup invocation and cancellation.
//!
//! Every keystroke that changes the typed text issues a new lookup. The
//! [`LookupCoordinator`] guarantees that only the most recently issued lookup
//! can leave lasting effects:
//!
//! - issuing a lookup first cancels the previous one's [`CancellationToken`];
//! - each lookup gets a generation number, and the continuation tag slot and
//!   the item mailbox only accept writes from the latest generation;
//! - the loading indicator is raised for the duration of the `invoke` call.
//!
//! Cancellation is cooperative. A superseded callback keeps running until it
//! polls its token, but whatever it posts afterwards is discarded.
//!
//! # Example
//!
//! ```
//! use lazy_combo::lookup::{LookupCoordinator, LookupMode};
//! use lazy_combo_core::UiContext;
//!
//! let ui = UiContext::new();
//! let mut coordinator = LookupCoordinator::<String>::new(ui.dispatcher());
//! coordinator.set_callback(|ctx| {
//!     let matches: Vec<String> = ["alice", "alina", "bob"]
//!         .iter()
//!         .filter(|name| name.starts_with(ctx.input()))
//!         .map(|name| name.to_string())
//!         .collect();
//!     ctx.post_items(matches);
//!     Ok(())
//! });
//!
//! let generation = coordinator.invoke("ali", LookupMode::Sync).unwrap();
//! assert_eq!(generation, Some(1));
//!
//! let posted = coordinator.take_items().unwrap();
//! assert_eq!(posted.value.items(), ["alice", "alina"]);
//! ```

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lazy_combo_core::logging::{span_names, targets};
use lazy_combo_core::{
    CancellationToken, Mailbox, ObservableProperty, Posted, TaskHandle, ThreadPool, UiDispatcher,
};
use parking_lot::Mutex;

use crate::error::LookupError;
use crate::item::ComboItem;
use crate::view::ItemsSource;

/// An opaque continuation value threaded from one lookup to the next.
///
/// Lookups use it for incremental or paged strategies, e.g. to remember the
/// result set the previous query narrowed down.
pub type LookupTag = Arc<dyn Any + Send + Sync>;

/// Wrap any value as a [`LookupTag`].
pub fn lookup_tag<V: Any + Send + Sync>(value: V) -> LookupTag {
    Arc::new(value)
}

/// Type alias for the caller-supplied lookup routine.
pub type LookupFn<T> = Arc<dyn Fn(LookupContext<T>) -> Result<(), LookupError> + Send + Sync>;

/// Where a lookup callback runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// On the lookup thread pool.
    Async,
    /// On the calling thread, before `invoke` returns.
    Sync,
}

#[derive(Default)]
struct RetainedTag {
    owner: u64,
    tag: Option<LookupTag>,
}

/// State shared between the coordinator and the contexts it hands out.
struct LookupShared<T> {
    latest: AtomicU64,
    retained: Mutex<RetainedTag>,
    items: Mailbox<ItemsSource<T>>,
    failures: Mailbox<LookupError>,
    dispatcher: UiDispatcher,
}

/// Everything a single lookup invocation needs.
///
/// Created fresh for every invocation and moved into the callback. The only
/// state that changes during its life is its cancellation token.
pub struct LookupContext<T> {
    input: String,
    cancellation: CancellationToken,
    tag: Option<LookupTag>,
    generation: u64,
    shared: Arc<LookupShared<T>>,
}

impl<T: ComboItem> LookupContext<T> {
    /// The typed text this lookup was issued for.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The token that is cancelled once a newer lookup is issued.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Shorthand for `self.cancellation().is_cancelled()`.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// The tag retained from earlier lookups, if any.
    pub fn tag(&self) -> Option<&LookupTag> {
        self.tag.as_ref()
    }

    /// The retained tag, downcast to a concrete type.
    pub fn tag_as<V: Any>(&self) -> Option<&V> {
        self.tag.as_deref().and_then(|tag| tag.downcast_ref::<V>())
    }

    /// The generation number of this invocation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Check whether no newer lookup has been issued since this one.
    pub fn is_latest(&self) -> bool {
        self.shared.latest.load(Ordering::Acquire) == self.generation
    }

    /// Store a continuation tag for the next lookup.
    ///
    /// The write is only accepted while this is the most recently issued
    /// lookup. Returns `false` if it was dropped.
    pub fn set_tag(&self, tag: LookupTag) -> bool {
        let mut retained = self.shared.retained.lock();
        if retained.owner != self.generation {
            tracing::trace!(
                target: targets::LOOKUP,
                generation = self.generation,
                owner = retained.owner,
                "tag from superseded lookup dropped"
            );
            return false;
        }
        retained.tag = Some(tag);
        true
    }

    /// Deliver a new candidate collection to the widget.
    ///
    /// The collection is applied on the UI context's next
    /// [`process_pending`](crate::LazyComboBox::process_pending). Returns
    /// `false` if it was discarded because this lookup is cancelled or
    /// superseded.
    pub fn post_items(&self, items: impl Into<ItemsSource<T>>) -> bool {
        if self.is_cancelled() {
            tracing::trace!(target: targets::LOOKUP, generation = self.generation, "post from cancelled lookup ignored");
            return false;
        }
        self.shared.items.post(self.generation, items.into())
    }

    /// A handle for running arbitrary closures on the UI context.
    pub fn dispatcher(&self) -> &UiDispatcher {
        &self.shared.dispatcher
    }
}

impl<T> fmt::Debug for LookupContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupContext")
            .field("input", &self.input)
            .field("generation", &self.generation)
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("has_tag", &self.tag.is_some())
            .finish()
    }
}

/// The pool lookups run on.
#[derive(Debug, Clone, Default)]
pub enum LookupPool {
    /// The process-wide [`ThreadPool::global`].
    #[default]
    Global,
    /// A pool owned by this widget.
    Dedicated(Arc<ThreadPool>),
}

impl LookupPool {
    fn get(&self) -> &ThreadPool {
        match self {
            LookupPool::Global => ThreadPool::global(),
            LookupPool::Dedicated(pool) => pool,
        }
    }
}

/// Clears the loading flag when the `invoke` call ends, however it ends.
struct LoadingGuard<'a> {
    loading: &'a ObservableProperty<bool>,
}

impl<'a> LoadingGuard<'a> {
    fn raise(loading: &'a ObservableProperty<bool>) -> Self {
        loading.set(true);
        Self { loading }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.loading.set(false);
    }
}

/// Issues lookups and enforces "latest invocation wins".
pub struct LookupCoordinator<T> {
    callback: Option<LookupFn<T>>,
    shared: Arc<LookupShared<T>>,
    pool: LookupPool,
    current: Option<CancellationToken>,
    outstanding: Vec<TaskHandle<()>>,
    loading: ObservableProperty<bool>,
}

impl<T: ComboItem> LookupCoordinator<T> {
    /// Create a coordinator that delivers to the UI context behind `dispatcher`.
    pub fn new(dispatcher: UiDispatcher) -> Self {
        Self {
            callback: None,
            shared: Arc::new(LookupShared {
                latest: AtomicU64::new(0),
                retained: Mutex::new(RetainedTag::default()),
                items: Mailbox::new(),
                failures: Mailbox::new(),
                dispatcher,
            }),
            pool: LookupPool::Global,
            current: None,
            outstanding: Vec::new(),
            loading: ObservableProperty::new(false),
        }
    }

    /// Use `pool` for asynchronous lookups.
    pub fn set_pool(&mut self, pool: LookupPool) {
        self.pool = pool;
    }

    /// Install the lookup routine.
    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: Fn(LookupContext<T>) -> Result<(), LookupError> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
    }

    /// Install or remove the lookup routine.
    pub fn set_callback_fn(&mut self, callback: Option<LookupFn<T>>) {
        self.callback = callback;
    }

    /// Whether a lookup routine is installed.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// The loading indicator.
    pub fn loading(&self) -> &ObservableProperty<bool> {
        &self.loading
    }

    /// The generation of the most recently issued lookup (0 before the first).
    pub fn latest_generation(&self) -> u64 {
        self.shared.latest.load(Ordering::Acquire)
    }

    /// The token of the most recently issued lookup.
    pub fn current_token(&self) -> Option<&CancellationToken> {
        self.current.as_ref()
    }

    /// The tag the next lookup will receive.
    pub fn retained_tag(&self) -> Option<LookupTag> {
        self.shared.retained.lock().tag.clone()
    }

    /// Issue a lookup for `input`.
    ///
    /// Returns the generation issued, or `None` when no routine is installed.
    /// In [`LookupMode::Sync`] the callback's error is returned as is; in
    /// [`LookupMode::Async`] failures are queued for [`take_failure`](Self::take_failure).
    pub fn invoke(&mut self, input: &str, mode: LookupMode) -> Result<Option<u64>, LookupError> {
        let Some(callback) = self.callback.clone() else {
            tracing::trace!(target: targets::LOOKUP, "no lookup routine installed");
            return Ok(None);
        };

        self.cancel();

        let generation = self.shared.latest.fetch_add(1, Ordering::AcqRel) + 1;
        let token = CancellationToken::new();
        self.current = Some(token.clone());

        let tag = {
            let mut retained = self.shared.retained.lock();
            retained.owner = generation;
            retained.tag.clone()
        };
        self.shared.items.advance(generation);
        self.shared.failures.advance(generation);

        let context = LookupContext {
            input: input.to_string(),
            cancellation: token.clone(),
            tag,
            generation,
            shared: self.shared.clone(),
        };

        let span = tracing::debug_span!(
            target: targets::LOOKUP,
            span_names::LOOKUP_INVOCATION,
            generation,
            ?mode
        );
        let _entered = span.enter();
        tracing::debug!(target: targets::LOOKUP, input, "issuing lookup");

        let _loading = LoadingGuard::raise(&self.loading);
        match mode {
            LookupMode::Sync => match callback(context) {
                Ok(()) | Err(LookupError::Cancelled) => {}
                Err(err) => return Err(err),
            },
            LookupMode::Async => {
                let shared = self.shared.clone();
                let handle = self.pool.get().spawn_with_token(token, move |token| {
                    if token.is_cancelled() {
                        tracing::trace!(target: targets::LOOKUP, generation, "lookup cancelled before start");
                        return;
                    }
                    let outcome = catch_unwind(AssertUnwindSafe(|| callback(context)))
                        .unwrap_or_else(|payload| Err(LookupError::Panicked(panic_message(&*payload))));
                    match outcome {
                        Ok(()) | Err(LookupError::Cancelled) => {}
                        Err(err) => {
                            tracing::warn!(target: targets::LOOKUP, generation, error = %err, "lookup failed");
                            shared.failures.post(generation, err);
                        }
                    }
                });
                self.outstanding.retain(|handle| !handle.is_finished());
                self.outstanding.push(handle);
            }
        }

        Ok(Some(generation))
    }

    /// Cancel the outstanding lookup, if any, without issuing a new one.
    pub fn cancel(&mut self) {
        if let Some(previous) = self.current.take()
            && previous.cancel()
        {
            tracing::debug!(
                target: targets::LOOKUP,
                generation = self.latest_generation(),
                "previous lookup cancelled"
            );
        }
    }

    /// Take the latest delivered candidate collection.
    pub fn take_items(&self) -> Option<Posted<ItemsSource<T>>> {
        self.shared.items.take()
    }

    /// Take the latest asynchronous failure.
    pub fn take_failure(&self) -> Option<Posted<LookupError>> {
        self.shared.failures.take()
    }

    /// Check whether anything is waiting for the UI context.
    pub fn has_pending(&self) -> bool {
        self.shared.items.has_pending() || self.shared.failures.has_pending()
    }

    /// Block until every asynchronous lookup issued so far has returned.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        for handle in &self.outstanding {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !handle.join_timeout(remaining) {
                return false;
            }
        }
        self.outstanding.clear();
        true
    }
}

impl<T> Drop for LookupCoordinator<T> {
    fn drop(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

impl<T> fmt::Debug for LookupCoordinator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupCoordinator")
            .field("has_callback", &self.callback.is_some())
            .field("latest", &self.shared.latest.load(Ordering::Acquire))
            .field("outstanding", &self.outstanding.len())
            .field("pool", &self.pool)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

static_assertions::assert_impl_all!(LookupContext<String>: Send);
static_assertions::assert_impl_all!(LookupCoordinator<String>: Send);
