//! Payment gateway adapter for the order-to-fulfillment pipeline.
//!
//! Creates payment intents with an external provider, verifies the
//! provider's completion callback by HMAC signature, stores the payment
//! record and publishes `payment.success` once a payment is verified.

pub mod error;
pub mod gateway;
pub mod memory;
pub mod payment;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod signature;

pub use error::{PaymentError, RepositoryError, Result};
pub use gateway::{
    ExternalOrder, ExternalOrderNotes, ExternalOrderRequest, GatewayClient, GatewayCredentials,
    InMemoryGateway, RazorpayClient,
};
pub use memory::InMemoryPaymentRepository;
pub use payment::{Payment, PaymentIntent, PaymentStatus, PaymentStatusView, VerificationOutcome};
pub use postgres::PostgresPaymentRepository;
pub use repository::PaymentRepository;
pub use service::PaymentGateway;
