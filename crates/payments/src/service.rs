//! Payment gateway service.

use std::sync::Arc;

use common::{OrderNumber, PaymentSucceeded};
use event_bus::{EventBus, EventBusExt};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::gateway::{ExternalOrderNotes, ExternalOrderRequest, GatewayClient, GatewayCredentials};
use crate::payment::CURRENCY;
use crate::{
    Payment, PaymentError, PaymentIntent, PaymentRepository, PaymentStatusView, Result,
    VerificationOutcome, signature,
};

/// Message returned when a callback signature does not match.
pub const SIGNATURE_MISMATCH: &str = "Signature verification failed";

/// Creates payment intents with the provider and completes them once the
/// provider's callback has been verified.
#[derive(Clone)]
pub struct PaymentGateway {
    repository: Arc<dyn PaymentRepository>,
    client: Arc<dyn GatewayClient>,
    bus: Arc<dyn EventBus>,
    credentials: GatewayCredentials,
}

impl PaymentGateway {
    pub fn new(
        repository: Arc<dyn PaymentRepository>,
        client: Arc<dyn GatewayClient>,
        bus: Arc<dyn EventBus>,
        credentials: GatewayCredentials,
    ) -> Self {
        Self {
            repository,
            client,
            bus,
            credentials,
        }
    }

    /// Returns whether credentials are present. Calls still fail individually
    /// when they are not.
    pub fn is_configured(&self) -> bool {
        self.credentials.is_configured()
    }

    /// Registers a payment with the provider and stores it as `CREATED`.
    ///
    /// The provider is called first; nothing is stored if it fails.
    #[tracing::instrument(skip(self), fields(external_order_id))]
    pub async fn create_payment_intent(
        &self,
        order_number: &OrderNumber,
        user_email: &str,
        amount: Decimal,
    ) -> Result<PaymentIntent> {
        self.credentials.ensure_configured().inspect_err(|e| {
            tracing::error!(error = %e, "payment provider credentials missing");
        })?;

        let minor_units = to_minor_units(amount)?;
        let request = ExternalOrderRequest {
            amount: minor_units,
            currency: CURRENCY.to_string(),
            receipt: order_number.to_string(),
            notes: ExternalOrderNotes {
                user_email: user_email.to_string(),
                order_number: order_number.to_string(),
            },
        };

        let external = self
            .client
            .create_order(&self.credentials, &request)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "provider order creation failed"))?;
        tracing::Span::current().record("external_order_id", external.id.as_str());

        let payment = Payment::created(order_number.clone(), user_email, amount, &external.id);
        let payment = self.repository.insert(&payment).await?;

        metrics::counter!("payment_intents_created_total").increment(1);
        tracing::info!(amount = %amount, minor_units, "payment intent created");

        Ok(PaymentIntent {
            external_order_id: payment.external_order_id,
            order_number: payment.order_number,
            amount: minor_units,
            currency: payment.currency,
            status: payment.status,
        })
    }

    /// Verifies a provider callback and, if valid, marks the payment
    /// successful and publishes `payment.success`.
    ///
    /// Every failure is reported as a `Failed` outcome, never as an error:
    /// a bad signature, an unknown `external_order_id`, missing credentials
    /// or a storage error. Only a bad signature or unknown order is
    /// guaranteed to change nothing. A valid callback repeated for the same
    /// payment overwrites the same row and publishes again.
    #[tracing::instrument(skip(self, signature))]
    pub async fn verify_and_complete(
        &self,
        external_order_id: &str,
        external_payment_id: &str,
        signature: &str,
    ) -> Result<VerificationOutcome> {
        let outcome = self
            .try_verify_and_complete(external_order_id, external_payment_id, signature)
            .await
            .unwrap_or_else(|e| {
                metrics::counter!("payment_verifications_total", "outcome" => "error")
                    .increment(1);
                tracing::error!(error = %e, "payment verification failed");
                VerificationOutcome::failed(e.to_string())
            });
        Ok(outcome)
    }

    async fn try_verify_and_complete(
        &self,
        external_order_id: &str,
        external_payment_id: &str,
        signature: &str,
    ) -> Result<VerificationOutcome> {
        self.credentials.ensure_configured()?;

        let valid = signature::verify(
            &self.credentials.key_secret,
            external_order_id,
            external_payment_id,
            signature,
        )
        .map_err(|e| PaymentError::Configuration(format!("unusable key secret: {e}")))?;

        if !valid {
            metrics::counter!("payment_verifications_total", "outcome" => "signature_mismatch")
                .increment(1);
            tracing::warn!("invalid payment signature");
            return Ok(VerificationOutcome::failed(SIGNATURE_MISMATCH));
        }

        let Some(mut payment) = self
            .repository
            .find_by_external_order_id(external_order_id)
            .await?
        else {
            metrics::counter!("payment_verifications_total", "outcome" => "not_found").increment(1);
            tracing::warn!("no payment record for verified callback");
            return Ok(VerificationOutcome::failed(format!(
                "Payment record not found: {external_order_id}"
            )));
        };

        payment.mark_succeeded(external_payment_id, signature);
        self.repository.update(&payment).await?;

        metrics::counter!("payment_verifications_total", "outcome" => "success").increment(1);
        tracing::info!(order_number = %payment.order_number, "payment verified");

        self.bus
            .publish_after_commit(&PaymentSucceeded {
                order_number: payment.order_number.clone(),
                user_email: payment.user_email.clone(),
                external_payment_id: external_payment_id.to_string(),
                amount: payment.amount,
            })
            .await;

        Ok(VerificationOutcome::Success {
            order_number: payment.order_number,
            external_payment_id: external_payment_id.to_string(),
        })
    }

    /// Projects the most recent payment for an order.
    #[tracing::instrument(skip(self))]
    pub async fn get_payment_status(
        &self,
        order_number: &OrderNumber,
    ) -> Result<PaymentStatusView> {
        let payment = self
            .repository
            .find_latest_by_order_number(order_number)
            .await?;

        Ok(payment
            .as_ref()
            .map(PaymentStatusView::from)
            .unwrap_or_else(PaymentStatusView::not_found))
    }
}

/// Converts a major-unit amount to minor units, truncating sub-paise digits.
fn to_minor_units(amount: Decimal) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(PaymentError::Validation(format!(
            "amount must be greater than 0, got {amount}"
        )));
    }
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.trunc().to_i64())
        .ok_or_else(|| PaymentError::Validation(format!("amount {amount} is too large")))
}
