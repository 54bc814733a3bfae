//! Domain error types.

use thiserror::Error;

use crate::order::OrderError;
use crate::repository::RepositoryError;

/// Errors that can occur in the order use-case layer.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The aggregate rejected the operation.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// The repository failed to load or persist the order.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl DomainError {
    /// Returns true if reloading the order and repeating the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::Repository(RepositoryError::ConcurrentModification { .. })
        )
    }
}
