use async_trait::async_trait;
use common::{PaymentSucceeded, status};
use event_bus::{EventBus, EventBusExt, EventHandler, HandlerError};

use crate::OrderLedger;

/// Marks orders as paid when `payment.success` arrives.
///
/// Only an order that is still awaiting payment (`PLACED` or `PENDING`) is
/// moved to `PAID`. Anything else is skipped, so a redelivered message or a
/// repeated verification never publishes a second status update or moves a
/// shipped order backwards.
#[derive(Clone)]
pub struct OrderStatusConsumer {
    ledger: OrderLedger,
}

impl OrderStatusConsumer {
    /// Consumer group this consumer joins.
    pub const GROUP_ID: &'static str = "order-group";

    pub fn new(ledger: OrderLedger) -> Self {
        Self { ledger }
    }

    /// Subscribes this consumer to `payment.success` under [`Self::GROUP_ID`].
    pub async fn register<B>(self, bus: &B) -> event_bus::Result<()>
    where
        B: EventBus + ?Sized,
    {
        self.register_in(bus, Self::GROUP_ID).await
    }

    /// Subscribes under a custom group id.
    pub async fn register_in<B>(self, bus: &B, group_id: &str) -> event_bus::Result<()>
    where
        B: EventBus + ?Sized,
    {
        bus.subscribe_to::<PaymentSucceeded, _>(group_id, self).await?;
        tracing::info!(group_id, "order status consumer registered");
        Ok(())
    }
}

#[async_trait]
impl EventHandler<PaymentSucceeded> for OrderStatusConsumer {
    #[tracing::instrument(skip(self, event), fields(order_number = %event.order_number))]
    async fn handle(&self, event: PaymentSucceeded) -> Result<(), HandlerError> {
        let order = self.ledger.get_order_by_number(&event.order_number).await?;
        if !awaits_payment(&order.status) {
            tracing::info!(current_status = %order.status, "order not awaiting payment; skipping");
            return Ok(());
        }

        self.ledger
            .update_order_status(&event.order_number, status::PAID)
            .await?;
        Ok(())
    }
}

fn awaits_payment(current: &str) -> bool {
    current == status::PLACED || current == status::PENDING
}
