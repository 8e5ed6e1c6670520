pub mod lifecycle;
pub mod rank_index;

pub use lifecycle::{Waitlist, WaitlistStats};
pub use rank_index::WaitingQueue;

use thiserror::Error;

/// Failure taxonomy for queue and lifecycle operations.
///
/// NotFound and Conflict are always surfaced to the immediate caller and
/// never retried internally. Storage failures are fatal to the request that
/// hit them. Token-verification failures are not errors at all; they
/// collapse to a rejection at the admission boundary.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("{0}")]
    Conflict(String),
    #[error("Party not found: {0}")]
    PartyNotFound(u64),
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::DatabaseError),
    #[error("Table not found: {0}")]
    TableNotFound(u64),
    #[error("One-time code failure: {0}")]
    Totp(#[from] crate::totp::TotpError),
}

impl QueueError {
    pub fn conflict(message: impl Into<String>) -> Self {
        QueueError::Conflict(message.into())
    }
}
