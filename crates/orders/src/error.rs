//! Order ledger error types.

use common::OrderNumber;
use thiserror::Error;

/// Errors raised by order storage.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An order with the same order number already exists.
    #[error("Order already exists: {0}")]
    Conflict(OrderNumber),
}

/// Errors that can occur during order ledger operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order request is malformed. Nothing was written.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No order exists with the given order number.
    #[error("Order not found: {0}")]
    NotFound(OrderNumber),

    /// The underlying storage failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        OrderError::Repository(RepositoryError::Database(e))
    }
}

/// Result type for order ledger operations.
pub type Result<T> = std::result::Result<T, OrderError>;
