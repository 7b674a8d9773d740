use async_trait::async_trait;
use common::OrderNumber;

use crate::{Payment, RepositoryError};

/// Storage for payment records.
///
/// Lookups return the most recently created matching row.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Stores a new payment and returns it with its id set.
    async fn insert(&self, payment: &Payment) -> Result<Payment, RepositoryError>;

    /// Persists the mutable fields of a stored payment: external references,
    /// status and `updated_at`.
    async fn update(&self, payment: &Payment) -> Result<(), RepositoryError>;

    /// Returns the newest payment recorded for an order, if any.
    async fn find_latest_by_order_number(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<Payment>, RepositoryError>;

    /// Looks up a payment by the provider's order id.
    async fn find_by_external_order_id(
        &self,
        external_order_id: &str,
    ) -> Result<Option<Payment>, RepositoryError>;
}
