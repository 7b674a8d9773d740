//! Payment gateway endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderNumber;
use payments::{PaymentIntent, PaymentStatusView, VerificationOutcome};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub order_number: OrderNumber,
    pub user_email: String,
    pub amount: Decimal,
}

/// Provider callback fields. Provider-prefixed names are accepted too, as
/// sent by the checkout widget.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(alias = "razorpayOrderId")]
    pub external_order_id: String,
    #[serde(alias = "razorpayPaymentId")]
    pub external_payment_id: String,
    #[serde(alias = "razorpaySignature")]
    pub signature: String,
}

/// POST /api/payments/create-order: Register a payment intent with the provider.
#[tracing::instrument(skip(state, req), fields(order_number = %req.order_number))]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<Json<PaymentIntent>, ApiError> {
    let intent = state
        .payments
        .create_payment_intent(&req.order_number, &req.user_email, req.amount)
        .await?;
    Ok(Json(intent))
}

/// POST /api/payments/verify: Check the provider signature and complete the payment.
///
/// A failed verification is answered with 400 and the `FAILED` body.
#[tracing::instrument(skip(state, req), fields(external_order_id = %req.external_order_id))]
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<(StatusCode, Json<VerificationOutcome>), ApiError> {
    let outcome = state
        .payments
        .verify_and_complete(
            &req.external_order_id,
            &req.external_payment_id,
            &req.signature,
        )
        .await?;

    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(outcome)))
}

/// GET /api/payments/{orderNumber}/status
#[tracing::instrument(skip(state))]
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
) -> Result<Json<PaymentStatusView>, ApiError> {
    let view = state
        .payments
        .get_payment_status(&OrderNumber::new(order_number))
        .await?;
    Ok(Json(view))
}
