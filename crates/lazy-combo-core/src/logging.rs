//! Logging facilities for LazyCombo.
//!
//! LazyCombo uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("lazy_combo=debug,lazy_combo_core=info")
//!         .init();
//! }
//! ```
//!
//! Every event is emitted under one of the [`targets`] so subsystems can be
//! filtered independently.

/// `tracing` targets, one per subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "lazy_combo_core::signal";
    /// UI-context dispatch target.
    pub const DISPATCH: &str = "lazy_combo_core::dispatch";
    /// Lookup worker pool target.
    pub const THREADPOOL: &str = "lazy_combo_core::threadpool";
    /// Lookup invocation and cancellation target.
    pub const LOOKUP: &str = "lazy_combo::lookup";
    /// Items view and cursor target.
    pub const VIEW: &str = "lazy_combo::view";
    /// Text/selection synchronization target.
    pub const SYNC: &str = "lazy_combo::sync";
    /// Interaction state machine target.
    pub const INTERACTION: &str = "lazy_combo::interaction";
}

/// Span names used for tracing.
pub mod span_names {
    /// A single lookup invocation, from issue to callback return.
    pub const LOOKUP_INVOCATION: &str = "lazy_combo::lookup_invocation";
    /// Draining the UI-context queues.
    pub const PROCESS_PENDING: &str = "lazy_combo::process_pending";
}
