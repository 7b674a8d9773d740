//! Payment provider client.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{PaymentError, Result};

/// Default provider endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.razorpay.com/v1";

/// Placeholder some deployments use for an unset secret.
const UNSET_SENTINEL: &str = "NOT_SET";

/// Key pair used to authenticate with the provider and check callbacks.
///
/// Missing credentials are accepted at startup and only rejected when a
/// payment operation needs them.
#[derive(Clone, Default)]
pub struct GatewayCredentials {
    pub key_id: String,
    pub key_secret: String,
}

impl GatewayCredentials {
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }

    /// Returns whether both the key id and the secret are usable.
    pub fn is_configured(&self) -> bool {
        is_set(&self.key_id) && is_set(&self.key_secret)
    }

    /// Fails with `PaymentError::Configuration` unless [`Self::is_configured`].
    pub fn ensure_configured(&self) -> Result<()> {
        if !is_set(&self.key_secret) {
            return Err(PaymentError::Configuration(
                "RAZORPAY_KEY_SECRET is not set".to_string(),
            ));
        }
        if !is_set(&self.key_id) {
            return Err(PaymentError::Configuration(
                "RAZORPAY_KEY_ID is not set".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_set(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != UNSET_SENTINEL
}

impl fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .finish()
    }
}

/// Body of a create-order call to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalOrderRequest {
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    /// Our order number, echoed back by the provider.
    pub receipt: String,
    pub notes: ExternalOrderNotes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalOrderNotes {
    pub user_email: String,
    pub order_number: String,
}

/// The provider's view of a created order. Only the id is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExternalOrder {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Creates orders with an external payment provider.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Registers an order with the provider and returns its reference.
    async fn create_order(
        &self,
        credentials: &GatewayCredentials,
        request: &ExternalOrderRequest,
    ) -> Result<ExternalOrder>;
}

/// REST client for the Razorpay orders API.
///
/// Uses the transport's default timeout.
#[derive(Clone)]
pub struct RazorpayClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for RazorpayClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl RazorpayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl GatewayClient for RazorpayClient {
    #[tracing::instrument(skip(self, credentials, request), fields(receipt = %request.receipt))]
    async fn create_order(
        &self,
        credentials: &GatewayCredentials,
        request: &ExternalOrderRequest,
    ) -> Result<ExternalOrder> {
        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&credentials.key_id, Some(&credentials.key_secret))
            .json(request)
            .send()
            .await
            .map_err(|e| PaymentError::Gateway(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Gateway(format!(
                "provider returned {}: {body}",
                status.as_u16()
            )));
        }

        let order = response
            .json::<ExternalOrder>()
            .await
            .map_err(|e| PaymentError::Gateway(format!("unreadable provider response: {e}")))?;

        tracing::debug!(external_order_id = %order.id, "provider order created");
        Ok(order)
    }
}

/// In-memory provider for tests and local runs.
///
/// Issues sequential `order_…` ids and records every request it accepts.
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    next_id: Arc<AtomicU64>,
    requests: Arc<Mutex<Vec<ExternalOrderRequest>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to reject every call.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Returns the requests accepted so far.
    pub fn requests(&self) -> Vec<ExternalOrderRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GatewayClient for InMemoryGateway {
    async fn create_order(
        &self,
        _credentials: &GatewayCredentials,
        request: &ExternalOrderRequest,
    ) -> Result<ExternalOrder> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PaymentError::Gateway("provider unavailable".to_string()));
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        Ok(ExternalOrder {
            id: format!("order_{n:014}"),
            status: Some("created".to_string()),
        })
    }
}
