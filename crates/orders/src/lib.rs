//! Order ledger for the order-to-fulfillment pipeline.
//!
//! This crate owns the order aggregate:
//! - [`Order`] records with line snapshots and a derived total
//! - [`OrderRepository`] with in-memory and PostgreSQL implementations
//! - [`OrderLedger`], which pairs each committed write with an event
//! - [`OrderStatusConsumer`], which marks orders paid on `payment.success`

pub mod consumer;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod repository;

pub use consumer::OrderStatusConsumer;
pub use error::{OrderError, RepositoryError, Result};
pub use ledger::OrderLedger;
pub use memory::InMemoryOrderRepository;
pub use order::{NewOrderLine, Order, OrderLine};
pub use postgres::PostgresOrderRepository;
pub use repository::OrderRepository;
