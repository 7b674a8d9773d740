//! Payment records and the values returned to callers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::OrderNumber;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency used for every payment.
pub const CURRENCY: &str = "INR";

/// Lifecycle state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Created,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "CREATED",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(PaymentStatus::Created),
            "SUCCESS" => Ok(PaymentStatus::Success),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// A payment attempt for an order.
///
/// Several payments may exist for one order number; the most recent one is
/// authoritative. `external_payment_id` and `external_signature` are set
/// exactly when the status is `Success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Option<i64>,
    pub order_number: OrderNumber,
    pub user_email: String,
    pub amount: Decimal,
    pub currency: String,
    pub external_order_id: String,
    pub external_payment_id: Option<String>,
    pub external_signature: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// A freshly created payment awaiting the provider's callback.
    pub fn created(
        order_number: OrderNumber,
        user_email: impl Into<String>,
        amount: Decimal,
        external_order_id: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            order_number,
            user_email: user_email.into(),
            amount,
            currency: CURRENCY.to_string(),
            external_order_id: external_order_id.into(),
            external_payment_id: None,
            external_signature: None,
            status: PaymentStatus::Created,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Records a verified completion.
    ///
    /// Calling this again on a successful payment overwrites the external
    /// references with the new values.
    pub fn mark_succeeded(
        &mut self,
        external_payment_id: impl Into<String>,
        external_signature: impl Into<String>,
    ) {
        self.external_payment_id = Some(external_payment_id.into());
        self.external_signature = Some(external_signature.into());
        self.status = PaymentStatus::Success;
        self.updated_at = Some(Utc::now());
    }
}

/// Returned when a payment intent has been created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub external_order_id: String,
    pub order_number: OrderNumber,
    /// Amount in minor units (paise).
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
}

/// Result of verifying a provider callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationOutcome {
    #[serde(rename_all = "camelCase")]
    Success {
        order_number: OrderNumber,
        external_payment_id: String,
    },
    Failed { message: String },
}

impl VerificationOutcome {
    pub(crate) fn failed(message: impl Into<String>) -> Self {
        VerificationOutcome::Failed {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, VerificationOutcome::Success { .. })
    }
}

/// Read projection of the most recent payment for an order.
///
/// Only `status` is present when no payment exists; it is then `NOT_FOUND`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusView {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PaymentStatusView {
    pub const NOT_FOUND: &'static str = "NOT_FOUND";

    pub fn not_found() -> Self {
        Self {
            status: Self::NOT_FOUND.to_string(),
            external_payment_id: None,
            amount: None,
            created_at: None,
        }
    }
}

impl From<&Payment> for PaymentStatusView {
    fn from(payment: &Payment) -> Self {
        Self {
            status: payment.status.to_string(),
            external_payment_id: Some(payment.external_payment_id.clone().unwrap_or_default()),
            amount: Some(payment.amount),
            created_at: Some(payment.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_payment_has_no_external_references() {
        let payment = Payment::created(
            OrderNumber::new("n-1"),
            "a@example.com",
            Decimal::new(25000, 2),
            "order_X",
        );

        assert_eq!(payment.status, PaymentStatus::Created);
        assert_eq!(payment.currency, "INR");
        assert!(payment.external_payment_id.is_none());
        assert!(payment.external_signature.is_none());
        assert!(payment.updated_at.is_none());
    }

    #[test]
    fn mark_succeeded_sets_references_together() {
        let mut payment = Payment::created(
            OrderNumber::new("n-1"),
            "a@example.com",
            Decimal::ONE,
            "order_X",
        );
        payment.mark_succeeded("pay_1", "sig");

        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.external_payment_id.as_deref(), Some("pay_1"));
        assert_eq!(payment.external_signature.as_deref(), Some("sig"));
        assert!(payment.updated_at.is_some());
    }

    #[test]
    fn status_parses_its_own_rendering() {
        for status in [
            PaymentStatus::Created,
            PaymentStatus::Success,
            PaymentStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("PENDING".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn outcomes_serialize_with_status_tag() {
        let success = VerificationOutcome::Success {
            order_number: OrderNumber::new("n-1"),
            external_payment_id: "pay_1".to_string(),
        };
        let value = serde_json::to_value(&success).unwrap();
        assert_eq!(value["status"], "SUCCESS");
        assert_eq!(value["orderNumber"], "n-1");
        assert_eq!(value["externalPaymentId"], "pay_1");

        let failed = VerificationOutcome::failed("Signature verification failed");
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["status"], "FAILED");
        assert_eq!(value["message"], "Signature verification failed");
    }

    #[test]
    fn status_view_projects_missing_payment_id_as_empty() {
        let payment = Payment::created(
            OrderNumber::new("n-1"),
            "a@example.com",
            Decimal::new(25000, 2),
            "order_X",
        );
        let view = PaymentStatusView::from(&payment);
        let value = serde_json::to_value(&view).unwrap();

        assert_eq!(value["status"], "CREATED");
        assert_eq!(value["externalPaymentId"], "");
        assert_eq!(value["amount"], 250.0);
        assert!(value["createdAt"].is_string());
    }

    #[test]
    fn not_found_view_has_only_status() {
        let value = serde_json::to_value(PaymentStatusView::not_found()).unwrap();
        assert_eq!(value, serde_json::json!({ "status": "NOT_FOUND" }));
    }
}
