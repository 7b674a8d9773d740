use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::OrderNumber;
use tokio::sync::RwLock;

use crate::{Order, OrderRepository, RepositoryError};

/// In-memory order repository for tests and single-process runs.
///
/// Orders are kept in insertion order, which doubles as creation order.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<Vec<Order>>>,
    fail_on_write: Arc<AtomicBool>,
}

impl InMemoryOrderRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Configures the repository to fail every write.
    pub fn set_fail_on_write(&self, fail: bool) {
        self.fail_on_write.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_on_write.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: &Order) -> Result<Order, RepositoryError> {
        self.check_writable()?;

        let mut orders = self.orders.write().await;
        if orders.iter().any(|o| o.order_number == order.order_number) {
            return Err(RepositoryError::Conflict(order.order_number.clone()));
        }

        let mut stored = order.clone();
        stored.id = Some(orders.len() as i64 + 1);
        orders.push(stored.clone());
        Ok(stored)
    }

    async fn update_status(
        &self,
        order_number: &OrderNumber,
        status: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        self.check_writable()?;

        let mut orders = self.orders.write().await;
        Ok(orders
            .iter_mut()
            .find(|o| &o.order_number == order_number)
            .map(|order| {
                order.status = status.to_string();
                order.clone()
            }))
    }

    async fn find_by_order_number(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders
            .iter()
            .find(|o| &o.order_number == order_number)
            .cloned())
    }

    async fn find_by_user_email(&self, user_email: &str) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders
            .iter()
            .filter(|o| o.user_email == user_email)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.orders.read().await.clone())
    }
}
