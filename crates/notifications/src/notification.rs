use common::{OrderPlaced, OrderStatusUpdated, OtpRequested, status};

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    OrderConfirmation,
    StatusUpdate,
    Otp,
}

/// A message addressed to one recipient.
///
/// The body is plain text; rich templates are left to whatever
/// [`crate::Notifier`] delivers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// First eight characters of an order number, upper-cased, for subjects.
fn short_reference(order_number: &str) -> String {
    order_number.chars().take(8).collect::<String>().to_uppercase()
}

fn status_subject(status: &str) -> &'static str {
    match status {
        status::SHIPPED => "Your Order is Shipped!",
        status::DELIVERED => "Order Delivered",
        status::CANCELLED => "Order Cancelled",
        status::OUT_FOR_DELIVERY => "Out for Delivery!",
        status::PAID => "Payment Received",
        _ => "Order Status Update",
    }
}

impl Notification {
    pub fn order_confirmation(event: &OrderPlaced) -> Self {
        let mut body = format!("Thank you for your order {}.\n\n", event.order_number);
        for item in &event.items {
            body.push_str(&format!(
                "  {} x{} @ {}\n",
                item.product_name, item.quantity, item.price
            ));
        }
        body.push_str(&format!("\nTotal: {}", event.total_amount));

        Self {
            kind: NotificationKind::OrderConfirmation,
            recipient: event.user_email.clone(),
            subject: format!(
                "Order Confirmed! #{}",
                short_reference(event.order_number.as_str())
            ),
            body,
        }
    }

    pub fn status_update(event: &OrderStatusUpdated) -> Self {
        Self {
            kind: NotificationKind::StatusUpdate,
            recipient: event.user_email.clone(),
            subject: format!(
                "{} #{}",
                status_subject(&event.status),
                short_reference(event.order_number.as_str())
            ),
            body: format!(
                "Your order {} is now {}.",
                event.order_number, event.status
            ),
        }
    }

    pub fn otp(event: &OtpRequested) -> Self {
        Self {
            kind: NotificationKind::Otp,
            recipient: event.email.clone(),
            subject: "Your OTP Code".to_string(),
            body: format!(
                "Your one-time code for {} is {}.",
                event.purpose, event.otp_code
            ),
        }
    }
}
