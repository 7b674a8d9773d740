//! HTTP API server for the order-to-fulfillment pipeline.
//!
//! Exposes the order ledger and the payment gateway adapter over REST,
//! wires the order status and notification consumers onto the event bus,
//! and serves health and Prometheus metrics endpoints.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use event_bus::{EventBus, InMemoryEventBus};
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::{LoggingNotifier, NotificationConsumer, Notifier};
use orders::{
    InMemoryOrderRepository, OrderLedger, OrderRepository, OrderStatusConsumer,
    PostgresOrderRepository,
};
use payments::{
    GatewayClient, GatewayCredentials, InMemoryPaymentRepository, PaymentGateway,
    PaymentRepository, PostgresPaymentRepository, RazorpayClient,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use error::StartupError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub ledger: OrderLedger,
    pub payments: PaymentGateway,
}

/// Storage, messaging and provider handles the services are built from.
#[derive(Clone)]
pub struct Backends {
    pub orders: Arc<dyn OrderRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub bus: Arc<dyn EventBus>,
    pub gateway: Arc<dyn GatewayClient>,
    pub credentials: GatewayCredentials,
    pub notifier: Arc<dyn Notifier>,
}

impl Backends {
    /// Picks Postgres or in-memory storage and Kafka or in-memory messaging
    /// from the configuration. Postgres migrations run here.
    pub async fn from_config(config: &Config) -> Result<Self, StartupError> {
        let (orders, payments) = repositories(config).await?;

        Ok(Self {
            orders,
            payments,
            bus: message_bus(config)?,
            gateway: Arc::new(RazorpayClient::new(&config.razorpay_base_url)),
            credentials: config.gateway_credentials(),
            notifier: Arc::new(LoggingNotifier),
        })
    }
}

async fn repositories(
    config: &Config,
) -> Result<(Arc<dyn OrderRepository>, Arc<dyn PaymentRepository>), StartupError> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, orders and payments are kept in memory");
        return Ok((
            Arc::new(InMemoryOrderRepository::new()),
            Arc::new(InMemoryPaymentRepository::new()),
        ));
    };

    let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;

    let orders = PostgresOrderRepository::new(pool.clone());
    orders.run_migrations().await?;
    let payments = PostgresPaymentRepository::new(pool);
    payments.run_migrations().await?;

    tracing::info!("using postgres storage");
    Ok((Arc::new(orders), Arc::new(payments)))
}

fn message_bus(config: &Config) -> Result<Arc<dyn EventBus>, StartupError> {
    match config.kafka_brokers.as_deref() {
        #[cfg(feature = "kafka")]
        Some(brokers) => {
            tracing::info!(brokers, "using kafka event bus");
            Ok(Arc::new(event_bus::KafkaEventBus::new(brokers)?))
        }
        #[cfg(not(feature = "kafka"))]
        Some(_) => {
            tracing::warn!("KAFKA_BROKERS is set but kafka support is not compiled in");
            Ok(Arc::new(InMemoryEventBus::with_partitions(
                config.event_bus_partitions,
            )))
        }
        None => Ok(Arc::new(InMemoryEventBus::with_partitions(
            config.event_bus_partitions,
        ))),
    }
}

/// Builds the services and subscribes the order status and notification
/// consumers to the bus.
pub async fn build_state(backends: Backends) -> Result<Arc<AppState>, StartupError> {
    let ledger = OrderLedger::new(backends.orders, backends.bus.clone());
    let payments = PaymentGateway::new(
        backends.payments,
        backends.gateway,
        backends.bus.clone(),
        backends.credentials,
    );

    if !payments.is_configured() {
        tracing::warn!("payment provider credentials missing, payment calls will fail");
    }

    OrderStatusConsumer::new(ledger.clone())
        .register(backends.bus.as_ref())
        .await?;
    NotificationConsumer::new(backends.notifier)
        .register(backends.bus.as_ref())
        .await?;

    Ok(Arc::new(AppState { ledger, payments }))
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/api/orders",
            post(routes::orders::place).get(routes::orders::list),
        )
        .route("/api/orders/{order_number}", get(routes::orders::get))
        .route(
            "/api/orders/{order_number}/status",
            patch(routes::orders::update_status),
        )
        .route(
            "/api/payments/create-order",
            post(routes::payments::create_order),
        )
        .route("/api/payments/verify", post(routes::payments::verify))
        .route(
            "/api/payments/{order_number}/status",
            get(routes::payments::status),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
