//! Application configuration loaded from environment variables.

use payments::GatewayCredentials;
use payments::gateway::DEFAULT_BASE_URL;

/// Log output format for the `fmt` layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `8080`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `DATABASE_URL`: Postgres connection string; in-memory storage when unset
/// - `KAFKA_BROKERS`: Kafka bootstrap servers; in-memory bus when unset
/// - `EVENT_BUS_PARTITIONS`: partitions per group on the in-memory bus (default: `4`)
/// - `RAZORPAY_KEY_ID`, `RAZORPAY_KEY_SECRET`: gateway credentials
/// - `RAZORPAY_BASE_URL`: gateway REST endpoint
///
/// Missing gateway credentials do not stop the server; payment calls fail
/// individually until they are set.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub kafka_brokers: Option<String>,
    pub event_bus_partitions: usize,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_base_url: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or_default(),
            database_url: non_empty("DATABASE_URL"),
            kafka_brokers: non_empty("KAFKA_BROKERS"),
            event_bus_partitions: lookup("EVENT_BUS_PARTITIONS")
                .and_then(|p| p.parse().ok())
                .filter(|&p| p > 0)
                .unwrap_or(defaults.event_bus_partitions),
            razorpay_key_id: lookup("RAZORPAY_KEY_ID").unwrap_or_default(),
            razorpay_key_secret: lookup("RAZORPAY_KEY_SECRET").unwrap_or_default(),
            razorpay_base_url: non_empty("RAZORPAY_BASE_URL").unwrap_or(defaults.razorpay_base_url),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn gateway_credentials(&self) -> GatewayCredentials {
        GatewayCredentials::new(&self.razorpay_key_id, &self.razorpay_key_secret)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            kafka_brokers: None,
            event_bus_partitions: 4,
            razorpay_key_id: String::new(),
            razorpay_key_secret: String::new(),
            razorpay_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}
