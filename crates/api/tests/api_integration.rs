//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::topics;
use event_bus::InMemoryEventBus;
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::{NotificationKind, RecordingNotifier};
use orders::InMemoryOrderRepository;
use payments::signature::compute_signature;
use payments::{GatewayCredentials, InMemoryGateway, InMemoryPaymentRepository};
use serde_json::{Value, json};
use tower::ServiceExt;

const KEY_ID: &str = "rzp_test_key";
const KEY_SECRET: &str = "test_secret";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    router: Router,
    bus: InMemoryEventBus,
    orders: InMemoryOrderRepository,
    payments: InMemoryPaymentRepository,
    gateway: InMemoryGateway,
    notifier: RecordingNotifier,
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn patch(&self, uri: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("PATCH")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn place_widget_order(&self, email: &str) -> String {
        let (status, json) = self
            .post(
                "/api/orders",
                json!({
                    "userEmail": email,
                    "items": [
                        {
                            "productId": "p-1",
                            "productName": "Widget",
                            "price": 100.00,
                            "quantity": 2
                        },
                        {
                            "productId": "p-2",
                            "productName": "Gadget",
                            "price": 50.00,
                            "quantity": 1
                        }
                    ]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        json["orderNumber"].as_str().unwrap().to_string()
    }
}

async fn setup_with(credentials: GatewayCredentials) -> TestApp {
    let bus = InMemoryEventBus::new().with_log();
    let orders = InMemoryOrderRepository::new();
    let payments = InMemoryPaymentRepository::new();
    let gateway = InMemoryGateway::new();
    let notifier = RecordingNotifier::new();

    let state = api::build_state(api::Backends {
        orders: Arc::new(orders.clone()),
        payments: Arc::new(payments.clone()),
        bus: Arc::new(bus.clone()),
        gateway: Arc::new(gateway.clone()),
        credentials,
        notifier: Arc::new(notifier.clone()),
    })
    .await
    .unwrap();

    TestApp {
        router: api::create_app(state, get_metrics_handle()),
        bus,
        orders,
        payments,
        gateway,
        notifier,
    }
}

async fn setup() -> TestApp {
    setup_with(GatewayCredentials::new(KEY_ID, KEY_SECRET)).await
}

#[tokio::test]
async fn test_health_check() {
    let app = setup().await;

    let (status, json) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["paymentProviderConfigured"], true);
}

#[tokio::test]
async fn test_health_reports_missing_credentials() {
    let app = setup_with(GatewayCredentials::new(KEY_ID, "NOT_SET")).await;

    let (status, json) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["paymentProviderConfigured"], false);
}

mod orders_api {
    use super::*;

    #[tokio::test]
    async fn test_place_and_get_order() {
        let app = setup().await;
        let order_number = app.place_widget_order("user@example.com").await;

        assert!(common::OrderNumber::new(order_number.as_str()).is_well_formed());

        let (status, json) = app.get(&format!("/api/orders/{order_number}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["orderNumber"], order_number.as_str());
        assert_eq!(json["status"], "PLACED");
        assert_eq!(json["totalAmount"].as_f64(), Some(250.0));
        assert_eq!(json["orderItems"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_place_order_without_items_is_rejected() {
        let app = setup().await;

        let (status, json) = app
            .post(
                "/api/orders",
                json!({"userEmail": "user@example.com", "items": []}),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("Validation"));
        assert_eq!(app.orders.order_count().await, 0);
        assert_eq!(app.bus.published_count(topics::ORDER_PLACED).await, 0);
    }

    #[tokio::test]
    async fn test_place_order_with_zero_quantity_is_rejected() {
        let app = setup().await;

        let (status, _) = app
            .post(
                "/api/orders",
                json!({
                    "userEmail": "user@example.com",
                    "items": [{
                        "productId": "p-1",
                        "productName": "Widget",
                        "price": 10.0,
                        "quantity": 0
                    }]
                }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(app.orders.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_get_unknown_order_returns_404() {
        let app = setup().await;

        let (status, json) = app.get("/api/orders/does-not-exist").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("does-not-exist"));
    }

    #[tokio::test]
    async fn test_list_orders_by_email() {
        let app = setup().await;
        app.place_widget_order("a@example.com").await;
        app.place_widget_order("a@example.com").await;
        app.place_widget_order("b@example.com").await;

        let (status, all) = app.get("/api/orders").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.as_array().unwrap().len(), 3);

        let (status, mine) = app.get("/api/orders?email=a@example.com").await;
        assert_eq!(status, StatusCode::OK);
        let mine = mine.as_array().unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|o| o["userEmail"] == "a@example.com"));
    }

    #[tokio::test]
    async fn test_update_status_notifies_the_customer() {
        let app = setup().await;
        let order_number = app.place_widget_order("user@example.com").await;

        let (status, json) = app
            .patch(&format!("/api/orders/{order_number}/status?status=SHIPPED"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "SHIPPED");

        app.bus.wait_for_idle().await;
        let sent = app.notifier.sent();
        assert!(sent.iter().any(|n| n.kind == NotificationKind::OrderConfirmation));
        assert!(
            sent.iter()
                .any(|n| n.kind == NotificationKind::StatusUpdate && n.body.contains("SHIPPED"))
        );
    }

    #[tokio::test]
    async fn test_update_status_of_unknown_order_returns_404() {
        let app = setup().await;

        let (status, _) = app.patch("/api/orders/missing/status?status=SHIPPED").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(app.bus.published_count(topics::ORDER_STATUS_UPDATE).await, 0);
    }

    #[tokio::test]
    async fn test_update_status_requires_status_parameter() {
        let app = setup().await;
        let order_number = app.place_widget_order("user@example.com").await;

        let (status, _) = app
            .patch(&format!("/api/orders/{order_number}/status"))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod payments_api {
    use super::*;

    #[tokio::test]
    async fn test_create_payment_order() {
        let app = setup().await;
        let order_number = app.place_widget_order("user@example.com").await;

        let (status, json) = app
            .post(
                "/api/payments/create-order",
                json!({
                    "orderNumber": order_number,
                    "userEmail": "user@example.com",
                    "amount": 250.00
                }),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["amount"], 25000);
        assert_eq!(json["currency"], "INR");
        assert_eq!(json["status"], "CREATED");
        assert!(json["externalOrderId"].as_str().unwrap().starts_with("order_"));

        let requests = app.gateway.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].receipt, order_number);
    }

    #[tokio::test]
    async fn test_create_payment_order_without_credentials_is_a_server_error() {
        let app = setup_with(GatewayCredentials::new(KEY_ID, "")).await;

        let (status, json) = app
            .post(
                "/api/payments/create-order",
                json!({"orderNumber": "n-1", "userEmail": "user@example.com", "amount": 10}),
            )
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("not configured"));
        assert_eq!(app.payments.payment_count().await, 0);
        assert!(app.gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_is_a_server_error() {
        let app = setup().await;
        app.gateway.set_fail(true);

        let (status, _) = app
            .post(
                "/api/payments/create-order",
                json!({"orderNumber": "n-1", "userEmail": "user@example.com", "amount": 10}),
            )
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(app.payments.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_forged_signature_returns_failed() {
        let app = setup().await;
        let (_, intent) = app
            .post(
                "/api/payments/create-order",
                json!({"orderNumber": "n-1", "userEmail": "user@example.com", "amount": 10}),
            )
            .await;

        let (status, json) = app
            .post(
                "/api/payments/verify",
                json!({
                    "externalOrderId": intent["externalOrderId"],
                    "externalPaymentId": "pay_1",
                    "signature": "forged"
                }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "FAILED");
        assert_eq!(app.payments.all().await[0].status.as_str(), "CREATED");
        assert_eq!(app.bus.published_count(topics::PAYMENT_SUCCESS).await, 0);
    }

    #[tokio::test]
    async fn test_verify_unknown_order_returns_not_found_message() {
        let app = setup().await;
        let signature = compute_signature(KEY_SECRET, "order_unknown", "pay_1").unwrap();

        let (status, json) = app
            .post(
                "/api/payments/verify",
                json!({
                    "razorpayOrderId": "order_unknown",
                    "razorpayPaymentId": "pay_1",
                    "razorpaySignature": signature
                }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "FAILED");
        assert!(json["message"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_verify_without_credentials_returns_failed() {
        let app = setup_with(GatewayCredentials::new(KEY_ID, "")).await;

        let (status, json) = app
            .post(
                "/api/payments/verify",
                json!({
                    "externalOrderId": "order_1",
                    "externalPaymentId": "pay_1",
                    "signature": "sig"
                }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "FAILED");
        assert!(json["message"].as_str().unwrap().contains("not configured"));
        assert_eq!(app.bus.published_count(topics::PAYMENT_SUCCESS).await, 0);
    }

    #[tokio::test]
    async fn test_verify_storage_failure_returns_failed() {
        let app = setup().await;
        let (_, intent) = app
            .post(
                "/api/payments/create-order",
                json!({"orderNumber": "n-1", "userEmail": "user@example.com", "amount": 10}),
            )
            .await;
        let external_order_id = intent["externalOrderId"].as_str().unwrap();
        let signature = compute_signature(KEY_SECRET, external_order_id, "pay_1").unwrap();
        app.payments.set_fail_on_write(true);

        let (status, json) = app
            .post(
                "/api/payments/verify",
                json!({
                    "externalOrderId": external_order_id,
                    "externalPaymentId": "pay_1",
                    "signature": signature
                }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "FAILED");
        assert_eq!(app.payments.all().await[0].status.as_str(), "CREATED");
    }

    #[tokio::test]
    async fn test_oversized_amount_is_rejected() {
        let app = setup().await;

        let (status, _) = app
            .post(
                "/api/payments/create-order",
                json!({
                    "orderNumber": "n-1",
                    "userEmail": "user@example.com",
                    "amount": 1e27
                }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_status_of_unpaid_order_is_not_found() {
        let app = setup().await;

        let (status, json) = app.get("/api/payments/n-404/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "NOT_FOUND");
    }
}

#[tokio::test]
async fn test_order_is_paid_after_verified_payment() {
    let app = setup().await;
    let order_number = app.place_widget_order("user@example.com").await;

    let (_, intent) = app
        .post(
            "/api/payments/create-order",
            json!({"orderNumber": order_number, "userEmail": "user@example.com", "amount": 250.00}),
        )
        .await;
    assert_eq!(intent["amount"], 25000);
    let external_order_id = intent["externalOrderId"].as_str().unwrap().to_string();

    let signature = compute_signature(KEY_SECRET, &external_order_id, "pay_abc").unwrap();
    let (status, json) = app
        .post(
            "/api/payments/verify",
            json!({
                "externalOrderId": external_order_id,
                "externalPaymentId": "pay_abc",
                "signature": signature
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "SUCCESS");
    assert_eq!(json["orderNumber"], order_number.as_str());
    assert_eq!(json["externalPaymentId"], "pay_abc");

    app.bus.wait_for_idle().await;

    assert_eq!(app.bus.published_count(topics::ORDER_PLACED).await, 1);
    assert_eq!(app.bus.published_count(topics::PAYMENT_SUCCESS).await, 1);

    let (_, order) = app.get(&format!("/api/orders/{order_number}")).await;
    assert_eq!(order["status"], "PAID");

    let (_, payment) = app
        .get(&format!("/api/payments/{order_number}/status"))
        .await;
    assert_eq!(payment["status"], "SUCCESS");
    assert_eq!(payment["externalPaymentId"], "pay_abc");

    let sent = app.notifier.sent();
    assert!(
        sent.iter()
            .any(|n| n.kind == NotificationKind::StatusUpdate && n.body.contains("PAID"))
    );
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup().await;
    app.place_widget_order("user@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_placed_total"));
}
