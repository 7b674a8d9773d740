//! Notification boundary.
//!
//! Subscribes to `order.placed`, `order.status.update` and `otp.requested`
//! in its own consumer group and turns each message into a [`Notification`]
//! for a [`Notifier`]. The order and payment side never wait on it.

pub mod consumer;
pub mod error;
pub mod notification;
pub mod notifier;
pub mod otp;

pub use consumer::NotificationConsumer;
pub use error::{NotificationError, Result};
pub use notification::{Notification, NotificationKind};
pub use notifier::{LoggingNotifier, Notifier, RecordingNotifier};
pub use otp::OtpPublisher;
