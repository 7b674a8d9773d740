use async_trait::async_trait;
use common::OrderNumber;

use crate::{Order, RepositoryError};

/// Storage for orders.
///
/// Each write is its own local transaction: an order and its lines are
/// stored together or not at all. Implementations assign the surrogate id.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores a new order with its lines and returns it with its id set.
    ///
    /// Returns `RepositoryError::Conflict` if the order number is taken.
    async fn insert(&self, order: &Order) -> Result<Order, RepositoryError>;

    /// Overwrites the status of an order.
    ///
    /// Returns the updated order, or `None` if no order has that number.
    async fn update_status(
        &self,
        order_number: &OrderNumber,
        status: &str,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Loads an order by its public number.
    async fn find_by_order_number(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Lists the orders placed by `user_email`, oldest first.
    async fn find_by_user_email(&self, user_email: &str) -> Result<Vec<Order>, RepositoryError>;

    /// Lists every order, oldest first.
    async fn find_all(&self) -> Result<Vec<Order>, RepositoryError>;
}
