//! Core plumbing for LazyCombo.
//!
//! This crate provides the pieces the selector widget is built from:
//!
//! - [`property`]: observable values that notify on change
//! - [`signal`]: synchronous slot lists
//! - [`threadpool`]: background lookups with cooperative cancellation
//! - [`dispatch`]: marshaling worker results back onto the UI context
//! - [`thread_check`]: UI-context affinity assertions
//!
//! # Worker to UI
//!
//! ```
//! use lazy_combo_core::dispatch::{Mailbox, UiContext};
//! use lazy_combo_core::threadpool::{ThreadPool, ThreadPoolConfig};
//! use std::sync::Arc;
//!
//! let ui = UiContext::new();
//! let pool = ThreadPool::new(ThreadPoolConfig::with_threads(1)).unwrap();
//! let mailbox = Arc::new(Mailbox::new());
//! mailbox.advance(1);
//!
//! let inbox = mailbox.clone();
//! pool.spawn(move || inbox.post(1, vec!["alice", "alina"])).wait();
//!
//! ui.process_pending();
//! assert_eq!(mailbox.take().map(|p| p.value.len()), Some(2));
//! ```

pub mod dispatch;
mod error;
pub mod logging;
pub mod property;
pub mod signal;
pub mod thread_check;
pub mod threadpool;

pub use dispatch::{Mailbox, Posted, UiContext, UiDispatcher};
pub use error::{CoreError, DispatchError, Result, ThreadPoolError};
pub use property::ObservableProperty;
pub use signal::{ConnectionId, Signal};
pub use thread_check::ThreadAffinity;
pub use threadpool::{CancellationToken, TaskHandle, ThreadPool, ThreadPoolConfig};
