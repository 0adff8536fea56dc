//! Owning-thread checks for UI-context state.
//!
//! A selector's observable state belongs to the thread that built it. Lookup
//! callbacks run on pool threads and reach that state only by posting through
//! the dispatcher. [`ThreadAffinity`] remembers the owning thread so mutating
//! entry points can assert they were reached from it.
//!
//! ```
//! use lazy_combo_core::thread_check::ThreadAffinity;
//!
//! let owner = ThreadAffinity::current();
//! owner.debug_assert_same_thread();
//!
//! let seen_elsewhere = std::thread::spawn(move || owner.is_same_thread())
//!     .join()
//!     .unwrap();
//! assert!(!seen_elsewhere);
//! ```

use std::thread::{self, ThreadId};

/// The thread a piece of state is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    owner: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Binds to the calling thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    #[inline]
    pub fn is_same_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Panics unless called on the owning thread.
    #[track_caller]
    pub fn assert_same_thread(&self) {
        if !self.is_same_thread() {
            wrong_thread(self.owner);
        }
    }

    /// [`assert_same_thread`](Self::assert_same_thread), compiled out of
    /// release builds.
    #[inline]
    #[track_caller]
    pub fn debug_assert_same_thread(&self) {
        if cfg!(debug_assertions) {
            self.assert_same_thread();
        }
    }
}

#[cold]
#[track_caller]
fn wrong_thread(owner: ThreadId) -> ! {
    let here = thread::current();
    panic!(
        "selector state touched from thread {:?} ({:?}), but it is owned by {owner:?}; \
         post lookup results with LookupContext::post_items or hop back through \
         LookupContext::dispatcher",
        here.name().unwrap_or("unnamed"),
        here.id(),
    )
}
