//! Errors surfaced to callers of [`CorrectionService`].
//!
//! Backend failures never appear here: they are recovered inside the
//! pipeline and reported through the explanation text.
//!
//! [`CorrectionService`]: crate::service::CorrectionService

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The submitted text is empty or whitespace only.
    #[error("text cannot be empty")]
    EmptyText,

    /// The job queue is at capacity; retry later.
    #[error("job queue is full ({capacity} jobs waiting)")]
    QueueFull { capacity: usize },

    /// Unknown job id, including ids already swept from the ledger.
    #[error("job '{0}' not found")]
    JobNotFound(String),
}
