//! Error types for the selector widget.

use lazy_combo_core::{CoreError, DispatchError};

/// Errors produced by, or reported for, a lookup callback.
///
/// Callbacks return this type. [`LookupError::Cancelled`] is how a callback
/// says it stopped because its token was cancelled; the coordinator swallows
/// it, since cancellation is never surfaced as an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The lookup failed for a reason of its own.
    #[error("lookup failed: {0}")]
    Failed(String),
    /// The lookup noticed cancellation and stopped early.
    #[error("lookup was cancelled")]
    Cancelled,
    /// The lookup callback panicked on a worker thread.
    #[error("lookup callback panicked: {0}")]
    Panicked(String),
    /// A UI-context hop failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Core plumbing failed (e.g. the lookup pool could not start).
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl LookupError {
    /// Create a [`LookupError::Failed`] from any message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Check whether this error only reports cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors from loading a [`ComboConfig`](crate::ComboConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("invalid combo configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A dedicated lookup pool needs at least one thread.
    #[error("lookup_threads must be at least 1")]
    ZeroLookupThreads,
}

/// A specialized Result type for lookups.
pub type Result<T> = std::result::Result<T, LookupError>;
