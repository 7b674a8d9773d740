use std::sync::Arc;

use common::{OtpPurpose, OtpRequested};
use event_bus::{EventBus, EventBusExt};
use rand::Rng;

use crate::Result;

/// Publishes `otp.requested` on behalf of the login flow.
///
/// Storing and checking the code is the caller's job; this only asks the
/// notification side to send it.
#[derive(Clone)]
pub struct OtpPublisher {
    bus: Arc<dyn EventBus>,
}

impl OtpPublisher {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// Generates a six-digit code.
    pub fn generate_code() -> String {
        rand::thread_rng().gen_range(100_000..1_000_000).to_string()
    }

    /// Publishes a request to send `otp_code` to `email`, keyed by email.
    #[tracing::instrument(skip(self, otp_code))]
    pub async fn publish(&self, email: &str, otp_code: &str, purpose: OtpPurpose) -> Result<()> {
        self.bus
            .publish_event(&OtpRequested {
                email: email.to_string(),
                otp_code: otp_code.to_string(),
                purpose,
            })
            .await?;
        tracing::info!("otp requested");
        Ok(())
    }

    /// Generates a code, publishes it and returns it for the caller to store.
    pub async fn request(&self, email: &str, purpose: OtpPurpose) -> Result<String> {
        let code = Self::generate_code();
        self.publish(email, &code, purpose).await?;
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::topics;
    use event_bus::InMemoryEventBus;

    #[test]
    fn codes_have_six_digits() {
        for _ in 0..100 {
            let code = OtpPublisher::generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            let n: u32 = code.parse().unwrap();
            assert!((100_000..1_000_000).contains(&n));
        }
    }

    #[tokio::test]
    async fn request_publishes_keyed_by_email() {
        let bus = InMemoryEventBus::new().with_log();
        let publisher = OtpPublisher::new(Arc::new(bus.clone()));

        let code = publisher
            .request("a@example.com", OtpPurpose::ResetPassword)
            .await
            .unwrap();

        let published = bus.published(topics::OTP_REQUESTED).await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].key, "a@example.com");
        assert_eq!(published[0].payload["otpCode"], code.as_str());
        assert_eq!(published[0].payload["purpose"], "RESET_PASSWORD");
    }

    #[tokio::test]
    async fn publish_failure_is_returned() {
        let bus = InMemoryEventBus::new();
        bus.set_fail_on_publish(true);
        let publisher = OtpPublisher::new(Arc::new(bus));

        let result = publisher.request("a@example.com", OtpPurpose::Login).await;
        assert!(result.is_err());
    }
}
