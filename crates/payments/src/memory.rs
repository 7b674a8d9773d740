use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::OrderNumber;
use tokio::sync::RwLock;

use crate::{Payment, PaymentRepository, RepositoryError};

/// In-memory payment repository for tests and single-process runs.
#[derive(Clone, Default)]
pub struct InMemoryPaymentRepository {
    payments: Arc<RwLock<Vec<Payment>>>,
    fail_on_write: Arc<AtomicBool>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored payments.
    pub async fn payment_count(&self) -> usize {
        self.payments.read().await.len()
    }

    /// Returns every stored payment, oldest first.
    pub async fn all(&self) -> Vec<Payment> {
        self.payments.read().await.clone()
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
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<Payment, RepositoryError> {
        self.check_writable()?;

        let mut payments = self.payments.write().await;
        let mut stored = payment.clone();
        stored.id = Some(payments.len() as i64 + 1);
        payments.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, payment: &Payment) -> Result<(), RepositoryError> {
        self.check_writable()?;

        let mut payments = self.payments.write().await;
        let stored = payments
            .iter_mut()
            .find(|p| p.id.is_some() && p.id == payment.id)
            .ok_or(RepositoryError::Database(sqlx::Error::RowNotFound))?;

        stored.external_payment_id = payment.external_payment_id.clone();
        stored.external_signature = payment.external_signature.clone();
        stored.status = payment.status;
        stored.updated_at = payment.updated_at;
        Ok(())
    }

    async fn find_latest_by_order_number(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<Payment>, RepositoryError> {
        let payments = self.payments.read().await;
        Ok(payments
            .iter()
            .rev()
            .find(|p| &p.order_number == order_number)
            .cloned())
    }

    async fn find_by_external_order_id(
        &self,
        external_order_id: &str,
    ) -> Result<Option<Payment>, RepositoryError> {
        let payments = self.payments.read().await;
        Ok(payments
            .iter()
            .rev()
            .find(|p| p.external_order_id == external_order_id)
            .cloned())
    }
}
