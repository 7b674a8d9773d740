//! The order aggregate.

use chrono::{DateTime, Utc};
use common::{OrderNumber, OrderPlaced, OrderPlacedItem, OrderStatusUpdated, status};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::OrderError;

/// A requested line, before it becomes part of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderLine {
    pub product_id: String,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl NewOrderLine {
    /// Creates a new requested line.
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i32,
        price: Decimal,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            price,
            quantity,
        }
    }
}

/// A line of a placed order.
///
/// Name and price are snapshots taken when the order was placed; later
/// catalog changes do not affect them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: String,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl OrderLine {
    /// Returns price × quantity, or `None` if it does not fit in a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

impl From<NewOrderLine> for OrderLine {
    fn from(line: NewOrderLine) -> Self {
        Self {
            product_id: line.product_id,
            product_name: line.product_name,
            price: line.price,
            quantity: line.quantity,
        }
    }
}

/// An order.
///
/// Everything except `status` is fixed once the order is placed. Status is a
/// free-form string that any caller may overwrite with any value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Surrogate key assigned by the repository. `None` until persisted.
    pub id: Option<i64>,
    pub order_number: OrderNumber,
    pub user_email: String,
    #[serde(rename = "orderItems")]
    pub lines: Vec<OrderLine>,
    pub total_amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Builds a new order in the `PLACED` state.
    ///
    /// Fails if the email is blank, there are no lines, or any line has a
    /// non-positive quantity or a negative price. The total is computed here
    /// and never recomputed.
    pub fn place(
        user_email: impl Into<String>,
        lines: Vec<NewOrderLine>,
    ) -> Result<Self, OrderError> {
        let user_email = user_email.into();
        if user_email.trim().is_empty() {
            return Err(OrderError::Validation("userEmail is required".to_string()));
        }
        if lines.is_empty() {
            return Err(OrderError::Validation(
                "order must contain at least one item".to_string(),
            ));
        }
        for line in &lines {
            if line.quantity <= 0 {
                return Err(OrderError::Validation(format!(
                    "quantity for {} must be greater than 0, got {}",
                    line.product_name, line.quantity
                )));
            }
            if line.price.is_sign_negative() && !line.price.is_zero() {
                return Err(OrderError::Validation(format!(
                    "price for {} must not be negative, got {}",
                    line.product_name, line.price
                )));
            }
        }

        let lines: Vec<OrderLine> = lines.into_iter().map(OrderLine::from).collect();
        let total_amount = lines
            .iter()
            .try_fold(Decimal::ZERO, |total, line| {
                line.line_total().and_then(|t| total.checked_add(t))
            })
            .ok_or_else(|| OrderError::Validation("total amount overflows".to_string()))?;

        Ok(Self {
            id: None,
            order_number: OrderNumber::generate(),
            user_email,
            lines,
            total_amount,
            status: status::PLACED.to_string(),
            created_at: Utc::now(),
        })
    }

    /// Returns the number of lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Builds the `order.placed` payload with the full line snapshot.
    pub fn placed_event(&self) -> OrderPlaced {
        OrderPlaced {
            order_number: self.order_number.clone(),
            user_email: self.user_email.clone(),
            total_amount: self.total_amount,
            items: self
                .lines
                .iter()
                .map(|line| OrderPlacedItem {
                    product_name: line.product_name.clone(),
                    quantity: line.quantity,
                    price: line.price,
                })
                .collect(),
        }
    }

    /// Builds the `order.status.update` payload for the current status.
    pub fn status_event(&self) -> OrderStatusUpdated {
        OrderStatusUpdated {
            order_number: self.order_number.clone(),
            user_email: self.user_email.clone(),
            status: self.status.clone(),
        }
    }
}
