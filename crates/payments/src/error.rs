use thiserror::Error;

/// Errors raised by payment storage.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Errors that can occur in the payment gateway adapter.
///
/// A forged or mismatched signature is not an error; it is reported as
/// [`crate::VerificationOutcome::Failed`].
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The request cannot be turned into a payment intent.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Gateway credentials are missing or blank.
    #[error("Payment provider is not configured: {0}")]
    Configuration(String),

    /// The provider call failed or returned something unusable.
    #[error("Payment provider error: {0}")]
    Gateway(String),

    /// The payment store failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PaymentError {
    fn from(e: sqlx::Error) -> Self {
        PaymentError::Repository(RepositoryError::Database(e))
    }
}

/// Result type for payment operations.
pub type Result<T> = std::result::Result<T, PaymentError>;
