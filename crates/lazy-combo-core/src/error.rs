//! Error types for LazyCombo core plumbing.

/// The main error type for core operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Thread pool related error.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] ThreadPoolError),
    /// Dispatch related error.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Thread pool-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThreadPoolError {
    /// Failed to create the thread pool.
    #[error("Failed to create thread pool: {0}")]
    CreationFailed(String),
    /// The global thread pool has already been initialized.
    #[error("Global thread pool has already been initialized")]
    AlreadyInitialized,
}

/// UI-context dispatch errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The UI context that owned the queue has been dropped.
    #[error("UI context has been dropped; invocation discarded")]
    ContextDropped,
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
