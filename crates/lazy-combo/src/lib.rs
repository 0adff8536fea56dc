//! LazyCombo: a selector widget with on-demand, cancellable lookups.
//!
//! The candidate list of a [`LazyComboBox`] is not preloaded. As the user
//! types, a caller-supplied lookup routine runs (normally on a worker thread)
//! and posts the matching candidates back. A lookup still running when new
//! input arrives is cancelled, and only the most recently issued lookup can
//! change what the widget shows.
//!
//! # Architecture
//!
//! - [`view`]: the caller's collection and a cursor view over it
//! - [`lookup`]: lookup invocation, cancellation and result delivery
//! - [`sync`]: keeping typed text, display text and selection consistent
//! - [`interaction`]: the pure open/editing state machine
//! - [`combo_box`]: the widget tying them together
//!
//! Rendering and input routing belong to the host framework, reached through
//! [`ComboHost`].
//!
//! # Quick Start
//!
//! ```
//! use lazy_combo::prelude::*;
//! use std::time::Duration;
//!
//! let mut combo = LazyComboBox::<String>::new()
//!     .with_items_source(Vec::<String>::new())
//!     .with_lookup(|ctx| {
//!         if ctx.is_cancelled() {
//!             return Err(LookupError::Cancelled);
//!         }
//!         ctx.post_items(vec![format!("{}@example.com", ctx.input())]);
//!         Ok(())
//!     });
//!
//! combo.set_text("bob").unwrap();
//! assert!(combo.wait_for_lookups(Duration::from_secs(5)));
//! combo.process_pending();
//!
//! let view = combo.items_view().unwrap();
//! assert_eq!(view.items(), ["bob@example.com"]);
//! ```

pub mod combo_box;
mod config;
mod error;
pub mod host;
pub mod interaction;
mod item;
pub mod lookup;
pub mod prelude;
pub mod sync;
pub mod view;

pub use combo_box::{ComboProperty, ComboStyle, LazyComboBox};
pub use config::ComboConfig;
pub use error::{ConfigError, LookupError, Result};
pub use host::{ComboHost, NullHost};
pub use interaction::{ComboAction, ComboKey, InteractionState, InteractionStateMachine};
pub use item::{ComboItem, display_text};
pub use lookup::{LookupContext, LookupMode, LookupPool, LookupTag, lookup_tag};
pub use sync::TextSelectionSync;
pub use view::{ItemsSource, ItemsView, ViewAdapter};

pub use lazy_combo_core::{CancellationToken, Signal, ThreadPool, ThreadPoolConfig};
