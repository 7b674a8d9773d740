//! Order ledger service.

use std::sync::Arc;

use common::OrderNumber;
use event_bus::{EventBus, EventBusExt};

use crate::{NewOrderLine, Order, OrderError, OrderRepository, Result};

/// Owns the order aggregate.
///
/// Every write commits through the repository first and only then publishes
/// its event. The publish is not part of the commit: if it fails the write
/// stands and the event is lost.
#[derive(Clone)]
pub struct OrderLedger {
    repository: Arc<dyn OrderRepository>,
    bus: Arc<dyn EventBus>,
}

impl OrderLedger {
    /// Creates a ledger over the given repository and bus.
    pub fn new(repository: Arc<dyn OrderRepository>, bus: Arc<dyn EventBus>) -> Self {
        Self { repository, bus }
    }

    /// Places an order and returns its new order number.
    ///
    /// Validation failures are returned before anything is written. After the
    /// order commits, `order.placed` is published with the full line snapshot.
    #[tracing::instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn place_order(
        &self,
        user_email: &str,
        lines: Vec<NewOrderLine>,
    ) -> Result<OrderNumber> {
        let order = Order::place(user_email, lines)?;
        let order = self.repository.insert(&order).await?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(
            order_number = %order.order_number,
            total_amount = %order.total_amount,
            "order placed"
        );

        self.bus.publish_after_commit(&order.placed_event()).await;

        Ok(order.order_number)
    }

    /// Loads an order by its number.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_by_number(&self, order_number: &OrderNumber) -> Result<Order> {
        self.repository
            .find_by_order_number(order_number)
            .await?
            .ok_or_else(|| OrderError::NotFound(order_number.clone()))
    }

    /// Overwrites the status of an order and publishes `order.status.update`.
    ///
    /// Any status may replace any other. Nothing is published for an unknown
    /// order.
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_number: &OrderNumber,
        status: &str,
    ) -> Result<Order> {
        let order = self
            .repository
            .update_status(order_number, status)
            .await?
            .ok_or_else(|| OrderError::NotFound(order_number.clone()))?;

        metrics::counter!("order_status_updates_total").increment(1);
        tracing::info!(order_number = %order.order_number, status, "order status updated");

        self.bus.publish_after_commit(&order.status_event()).await;

        Ok(order)
    }

    /// Lists every order.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_orders(&self) -> Result<Vec<Order>> {
        Ok(self.repository.find_all().await?)
    }

    /// Lists the orders placed by `user_email`.
    #[tracing::instrument(skip(self))]
    pub async fn get_orders_by_user(&self, user_email: &str) -> Result<Vec<Order>> {
        Ok(self.repository.find_by_user_email(user_email).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryOrderRepository;
    use common::{OrderPlaced, OrderStatusUpdated, topics};
    use event_bus::InMemoryEventBus;
    use rust_decimal::Decimal;

    fn setup() -> (OrderLedger, InMemoryOrderRepository, InMemoryEventBus) {
        let repo = InMemoryOrderRepository::new();
        let bus = InMemoryEventBus::new().with_log();
        let ledger = OrderLedger::new(Arc::new(repo.clone()), Arc::new(bus.clone()));
        (ledger, repo, bus)
    }

    fn lines() -> Vec<NewOrderLine> {
        vec![
            NewOrderLine::new("p-1", "Widget", 2, Decimal::new(10000, 2)),
            NewOrderLine::new("p-2", "Gadget", 1, Decimal::new(5000, 2)),
        ]
    }

    #[tokio::test]
    async fn place_order_persists_and_publishes() {
        let (ledger, repo, bus) = setup();

        let number = ledger.place_order("a@example.com", lines()).await.unwrap();

        let order = ledger.get_order_by_number(&number).await.unwrap();
        assert_eq!(order.total_amount, Decimal::new(25000, 2));
        assert_eq!(order.status, "PLACED");
        assert_eq!(repo.order_count().await, 1);

        let published = bus.published(topics::ORDER_PLACED).await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].key, number.as_str());
        let event: OrderPlaced = published[0].decode().unwrap();
        assert_eq!(event.items.len(), 2);
        assert_eq!(event.total_amount, Decimal::new(25000, 2));
    }

    #[tokio::test]
    async fn place_order_returns_distinct_numbers() {
        let (ledger, _, _) = setup();

        let a = ledger.place_order("a@example.com", lines()).await.unwrap();
        let b = ledger.place_order("a@example.com", lines()).await.unwrap();

        assert_ne!(a, b);
        assert!(a.is_well_formed());
        assert!(b.is_well_formed());
    }

    #[tokio::test]
    async fn invalid_order_writes_and_publishes_nothing() {
        let (ledger, repo, bus) = setup();

        let result = ledger.place_order("a@example.com", vec![]).await;
        assert!(matches!(result, Err(OrderError::Validation(_))));

        let bad_quantity = vec![NewOrderLine::new("p", "Widget", 0, Decimal::ONE)];
        let result = ledger.place_order("a@example.com", bad_quantity).await;
        assert!(matches!(result, Err(OrderError::Validation(_))));

        assert_eq!(repo.order_count().await, 0);
        assert_eq!(bus.published_count(topics::ORDER_PLACED).await, 0);
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_the_order() {
        let (ledger, repo, bus) = setup();
        bus.set_fail_on_publish(true);

        let number = ledger.place_order("a@example.com", lines()).await.unwrap();

        assert_eq!(repo.order_count().await, 1);
        assert!(ledger.get_order_by_number(&number).await.is_ok());
    }

    #[tokio::test]
    async fn repository_failure_publishes_nothing() {
        let (ledger, repo, bus) = setup();
        repo.set_fail_on_write(true);

        let result = ledger.place_order("a@example.com", lines()).await;

        assert!(matches!(result, Err(OrderError::Repository(_))));
        assert_eq!(bus.published_count(topics::ORDER_PLACED).await, 0);
    }

    #[tokio::test]
    async fn get_unknown_order_is_not_found() {
        let (ledger, _, _) = setup();
        let result = ledger.get_order_by_number(&OrderNumber::new("nope")).await;
        assert!(matches!(result, Err(OrderError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_status_overwrites_and_publishes() {
        let (ledger, _, bus) = setup();
        let number = ledger.place_order("a@example.com", lines()).await.unwrap();

        let order = ledger.update_order_status(&number, "SHIPPED").await.unwrap();
        assert_eq!(order.status, "SHIPPED");

        let published = bus.published(topics::ORDER_STATUS_UPDATE).await;
        assert_eq!(published.len(), 1);
        let event: OrderStatusUpdated = published[0].decode().unwrap();
        assert_eq!(event.order_number, number);
        assert_eq!(event.user_email, "a@example.com");
        assert_eq!(event.status, "SHIPPED");
    }

    #[tokio::test]
    async fn update_status_of_unknown_order_publishes_nothing() {
        let (ledger, _, bus) = setup();

        let result = ledger
            .update_order_status(&OrderNumber::new("nope"), "PAID")
            .await;

        assert!(matches!(result, Err(OrderError::NotFound(_))));
        assert_eq!(bus.published_count(topics::ORDER_STATUS_UPDATE).await, 0);
    }

    #[tokio::test]
    async fn orders_can_be_listed_by_user() {
        let (ledger, _, _) = setup();
        ledger.place_order("a@example.com", lines()).await.unwrap();
        ledger.place_order("b@example.com", lines()).await.unwrap();

        assert_eq!(ledger.get_all_orders().await.unwrap().len(), 2);
        let mine = ledger.get_orders_by_user("b@example.com").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_email, "b@example.com");
    }
}
