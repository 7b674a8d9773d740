use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public identifier of an order.
///
/// Generated once as a UUID-v4 string when the order is placed and never
/// changed afterwards. Lookups accept any string, so an `OrderNumber` read
/// from a request is not guaranteed to be well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a fresh order number.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing order number.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the order number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the value parses as a UUID.
    pub fn is_well_formed(&self) -> bool {
        Uuid::parse_str(&self.0).is_ok()
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Order status vocabulary.
///
/// Status is stored as a plain string and any value may overwrite any other;
/// these constants only name the values the pipeline itself writes or reads.
pub mod status {
    pub const PENDING: &str = "PENDING";
    pub const PLACED: &str = "PLACED";
    pub const PAID: &str = "PAID";
    pub const SHIPPED: &str = "SHIPPED";
    pub const OUT_FOR_DELIVERY: &str = "OUT_FOR_DELIVERY";
    pub const DELIVERED: &str = "DELIVERED";
    pub const CANCELLED: &str = "CANCELLED";
}
