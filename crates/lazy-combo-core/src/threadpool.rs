//! Worker threads for lookup callbacks.
//!
//! Lookups run on a rayon pool so typing never blocks the UI context. Each
//! lookup carries a [`CancellationToken`]; superseding it only flips the
//! token, and the callback decides when to notice. [`TaskHandle`] lets the
//! widget wait for stragglers in tests and on shutdown.
//!
//! ```
//! use lazy_combo_core::threadpool::{CancellationToken, ThreadPool, ThreadPoolConfig};
//!
//! let pool = ThreadPool::new(ThreadPoolConfig::with_threads(1)).unwrap();
//! let token = CancellationToken::new();
//! token.cancel();
//!
//! let handle = pool.spawn_with_token(token, |token| {
//!     if token.is_cancelled() { Vec::new() } else { vec!["alice"] }
//! });
//! assert_eq!(handle.wait(), Some(Vec::new()));
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, bounded};
use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool as RayonThreadPool, ThreadPoolBuilder};

use crate::error::{CoreError, ThreadPoolError};
use crate::logging::targets;

static GLOBAL_POOL: OnceLock<ThreadPool> = OnceLock::new();
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Cooperative cancellation flag shared between a lookup and its issuer.
///
/// Cancelling never interrupts anything. The callback polls
/// [`is_cancelled`](Self::is_cancelled) and stops on its own. Once cancelled,
/// a token stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `true` for the call that actually flipped the flag.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }
}

/// Completion latch shared by a task and its handle.
#[derive(Debug, Default)]
struct Done {
    finished: Mutex<bool>,
    cv: Condvar,
}

impl Done {
    fn mark(&self) {
        *self.finished.lock() = true;
        self.cv.notify_all();
    }

    fn is_set(&self) -> bool {
        *self.finished.lock()
    }

    fn wait(&self) {
        let mut finished = self.finished.lock();
        while !*finished {
            self.cv.wait(&mut finished);
        }
    }

    fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut finished = self.finished.lock();
        while !*finished {
            if self.cv.wait_until(&mut finished, deadline).timed_out() {
                break;
            }
        }
        *finished
    }
}

/// Marks the latch however the task body exits.
struct MarkOnDrop(Arc<Done>);

impl Drop for MarkOnDrop {
    fn drop(&mut self) {
        self.0.mark();
    }
}

/// Handle to a task queued on a [`ThreadPool`].
///
/// Dropping the handle detaches the task; it still runs to completion.
#[derive(Debug)]
pub struct TaskHandle<T> {
    result: Receiver<T>,
    done: Arc<Done>,
}

impl<T> TaskHandle<T> {
    /// Whether the task has returned or panicked.
    pub fn is_finished(&self) -> bool {
        self.done.is_set()
    }

    /// Blocks up to `timeout` for the task to finish, leaving the result in
    /// place. Returns `false` if it is still running.
    pub fn join_timeout(&self, timeout: Duration) -> bool {
        self.done.wait_for(timeout)
    }

    /// Blocks until the task finishes. `None` means it panicked.
    pub fn wait(self) -> Option<T> {
        self.done.wait();
        self.result.try_recv().ok()
    }
}

/// Worker pool settings, usually derived from the widget's TOML config.
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    /// Worker count; `None` lets rayon pick one per core.
    pub num_threads: Option<usize>,
    /// Workers are named `{thread_name}-{index}`.
    pub thread_name: String,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name: "lazy-combo-lookup".to_string(),
        }
    }
}

impl ThreadPoolConfig {
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
            ..Default::default()
        }
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// Pool that lookup callbacks run on.
///
/// A panicking task is caught and logged; its handle yields `None` and the
/// worker stays alive.
pub struct ThreadPool {
    pool: RayonThreadPool,
    active_tasks: Arc<AtomicUsize>,
}

impl ThreadPool {
    /// The shared pool used by widgets without a dedicated one.
    ///
    /// Built with [`ThreadPoolConfig::default`] on first use unless
    /// [`init_global`](Self::init_global) ran earlier.
    ///
    /// # Panics
    ///
    /// If the OS refuses to start the workers.
    pub fn global() -> &'static ThreadPool {
        GLOBAL_POOL.get_or_init(|| {
            ThreadPool::new(ThreadPoolConfig::default())
                .expect("failed to start the shared lookup pool")
        })
    }

    /// Installs a custom shared pool. Fails once the shared pool exists.
    pub fn init_global(config: ThreadPoolConfig) -> Result<&'static ThreadPool, CoreError> {
        let pool = ThreadPool::new(config)?;
        GLOBAL_POOL
            .set(pool)
            .map_err(|_| ThreadPoolError::AlreadyInitialized)?;
        Ok(Self::global())
    }

    pub fn new(config: ThreadPoolConfig) -> Result<Self, CoreError> {
        let prefix = config.thread_name.clone();
        let mut builder =
            ThreadPoolBuilder::new().thread_name(move |index| format!("{prefix}-{index}"));
        if let Some(n) = config.num_threads {
            builder = builder.num_threads(n);
        }

        let pool = builder
            .build()
            .map_err(|e| ThreadPoolError::CreationFailed(e.to_string()))?;

        tracing::debug!(
            target: targets::THREADPOOL,
            threads = pool.current_num_threads(),
            name = %config.thread_name,
            "lookup pool started"
        );

        Ok(Self {
            pool,
            active_tasks: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Tasks queued or running.
    pub fn active_tasks(&self) -> usize {
        self.active_tasks.load(Ordering::Acquire)
    }

    pub fn spawn<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.spawn_internal(task)
    }

    /// Queues `task`, handing it `token` to poll.
    pub fn spawn_with_token<F, T>(&self, token: CancellationToken, task: F) -> TaskHandle<T>
    where
        F: FnOnce(CancellationToken) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.spawn_internal(move || task(token))
    }

    fn spawn_internal<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, result) = bounded(1);
        let done = Arc::new(Done::default());
        let mark = MarkOnDrop(done.clone());

        self.active_tasks.fetch_add(1, Ordering::AcqRel);
        let active_tasks = self.active_tasks.clone();

        self.pool.spawn(move || {
            let _mark = mark;
            match catch_unwind(AssertUnwindSafe(task)) {
                Ok(result) => {
                    let _ = sender.send(result);
                }
                Err(_) => {
                    tracing::error!(target: targets::THREADPOOL, task_id = id, "task panicked");
                }
            }
            active_tasks.fetch_sub(1, Ordering::AcqRel);
        });

        TaskHandle { result, done }
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_threads", &self.num_threads())
            .field("active_tasks", &self.active_tasks())
            .finish()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync, Clone);
