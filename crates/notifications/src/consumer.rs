use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderPlaced, OrderStatusUpdated, OtpRequested};
use event_bus::{EventBus, EventBusExt, EventHandler, HandlerError};

use crate::{Notification, Notifier};

/// Turns order and OTP events into notifications.
///
/// Delivery failures go back to the bus, which logs them and moves on.
#[derive(Clone)]
pub struct NotificationConsumer {
    notifier: Arc<dyn Notifier>,
}

impl NotificationConsumer {
    /// Consumer group shared by all notification instances.
    pub const GROUP_ID: &'static str = "notification-service-group";

    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Subscribes to all three topics under [`Self::GROUP_ID`].
    pub async fn register<B>(self, bus: &B) -> event_bus::Result<()>
    where
        B: EventBus + ?Sized,
    {
        bus.subscribe_to::<OrderPlaced, _>(Self::GROUP_ID, self.clone())
            .await?;
        bus.subscribe_to::<OrderStatusUpdated, _>(Self::GROUP_ID, self.clone())
            .await?;
        bus.subscribe_to::<OtpRequested, _>(Self::GROUP_ID, self)
            .await?;

        tracing::info!(group_id = Self::GROUP_ID, "notification consumer registered");
        Ok(())
    }

    async fn deliver(&self, notification: Notification) -> Result<(), HandlerError> {
        self.notifier.send(&notification).await?;
        metrics::counter!("notifications_sent_total", "kind" => format!("{:?}", notification.kind))
            .increment(1);
        Ok(())
    }
}

#[async_trait]
impl EventHandler<OrderPlaced> for NotificationConsumer {
    #[tracing::instrument(skip(self, event), fields(order_number = %event.order_number))]
    async fn handle(&self, event: OrderPlaced) -> Result<(), HandlerError> {
        self.deliver(Notification::order_confirmation(&event)).await
    }
}

#[async_trait]
impl EventHandler<OrderStatusUpdated> for NotificationConsumer {
    #[tracing::instrument(
        skip(self, event),
        fields(order_number = %event.order_number, status = %event.status)
    )]
    async fn handle(&self, event: OrderStatusUpdated) -> Result<(), HandlerError> {
        self.deliver(Notification::status_update(&event)).await
    }
}

#[async_trait]
impl EventHandler<OtpRequested> for NotificationConsumer {
    #[tracing::instrument(skip(self, event), fields(purpose = %event.purpose))]
    async fn handle(&self, event: OtpRequested) -> Result<(), HandlerError> {
        self.deliver(Notification::otp(&event)).await
    }
}
