//! Prelude module for LazyCombo.
//!
//! ```ignore
//! use lazy_combo::prelude::*;
//! ```

// ============================================================================
// Widget
// ============================================================================

pub use crate::combo_box::{ComboProperty, ComboStyle, LazyComboBox};
pub use crate::config::ComboConfig;
pub use crate::host::{ComboHost, NullHost};
pub use crate::interaction::{ComboKey, InteractionState};

// ============================================================================
// Items and Lookups
// ============================================================================

pub use crate::error::{LookupError, Result};
pub use crate::item::ComboItem;
pub use crate::lookup::{LookupContext, LookupTag, lookup_tag};
pub use crate::view::{ItemsSource, ItemsView};

// ============================================================================
// Core
// ============================================================================

pub use lazy_combo_core::{CancellationToken, ConnectionId, Signal};
