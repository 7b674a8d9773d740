//! Topic names and the payload published on each topic.
//!
//! Field names are part of the wire contract with the notification side and
//! are serialized in camelCase.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::OrderNumber;

/// Topic names shared by publishers and subscribers.
pub mod topics {
    pub const ORDER_PLACED: &str = "order.placed";
    pub const ORDER_STATUS_UPDATE: &str = "order.status.update";
    pub const PAYMENT_SUCCESS: &str = "payment.success";
    pub const OTP_REQUESTED: &str = "otp.requested";
}

/// A payload bound to a single topic.
///
/// The key determines ordering on the bus: messages sharing a key are
/// delivered to each consumer group in publish order.
pub trait TopicEvent: Serialize {
    /// The topic this payload is published on.
    const TOPIC: &'static str;

    /// The routing key for this message.
    fn key(&self) -> &str;
}

/// Published after an order has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
    pub order_number: OrderNumber,
    pub user_email: String,
    pub total_amount: Decimal,
    pub items: Vec<OrderPlacedItem>,
}

/// Line snapshot carried by [`OrderPlaced`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacedItem {
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

impl TopicEvent for OrderPlaced {
    const TOPIC: &'static str = topics::ORDER_PLACED;

    fn key(&self) -> &str {
        self.order_number.as_str()
    }
}

/// Published after an order's status has been overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdated {
    pub order_number: OrderNumber,
    pub user_email: String,
    pub status: String,
}

impl TopicEvent for OrderStatusUpdated {
    const TOPIC: &'static str = topics::ORDER_STATUS_UPDATE;

    fn key(&self) -> &str {
        self.order_number.as_str()
    }
}

/// Published after a payment has been verified and marked successful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSucceeded {
    pub order_number: OrderNumber,
    pub user_email: String,
    pub external_payment_id: String,
    pub amount: Decimal,
}

impl TopicEvent for PaymentSucceeded {
    const TOPIC: &'static str = topics::PAYMENT_SUCCESS;

    fn key(&self) -> &str {
        self.order_number.as_str()
    }
}

/// Why a one-time password was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpPurpose {
    Login,
    Register,
    ResetPassword,
}

impl std::fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OtpPurpose::Login => write!(f, "LOGIN"),
            OtpPurpose::Register => write!(f, "REGISTER"),
            OtpPurpose::ResetPassword => write!(f, "RESET_PASSWORD"),
        }
    }
}

/// Published by the login flow when an OTP email must be sent. Keyed by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRequested {
    pub email: String,
    pub otp_code: String,
    pub purpose: OtpPurpose,
}

impl TopicEvent for OtpRequested {
    const TOPIC: &'static str = topics::OTP_REQUESTED;

    fn key(&self) -> &str {
        &self.email
    }
}
