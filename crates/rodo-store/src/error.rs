use thiserror::Error;

/// Errors raised by the conversation store.
///
/// Storage failures are never retried here; they propagate to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A row the caller referenced does not exist.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Another thread panicked while holding the connection lock.
    #[error("store connection lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;
