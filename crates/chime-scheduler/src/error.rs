use thiserror::Error;

/// Errors from the scheduling engine and the lifecycle operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying store failure.
    #[error("Store error: {0}")]
    Store(#[from] chime_store::StoreError),

    /// The reminder does not exist or is already inactive.
    #[error("Reminder not found: {id}")]
    NotFound { id: i64 },

    /// Rejected before touching the store or the timer table.
    #[error("Invalid input: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
