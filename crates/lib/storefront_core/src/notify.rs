//! Delivery seam for password-reset links.
//!
//! Mail transport lives outside this crate. The default [`LogNotifier`]
//! records the event through `tracing`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Receives freshly issued reset secrets for delivery to the account owner.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_password_reset(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), NotifyError>;
}

/// Logs that a reset was requested. The secret never reaches the log.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    base_url: String,
}

impl LogNotifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Link the storefront UI uses to complete a reset.
    pub fn reset_link(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={token}",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ResetNotifier for LogNotifier {
    async fn send_password_reset(
        &self,
        email: &str,
        _token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        info!(email, %expires_at, base_url = %self.base_url, "password reset requested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn reset_link_joins_base_url_without_double_slash() {
        let notifier = LogNotifier::new("https://shop.test/");
        assert_eq!(
            notifier.reset_link("abc"),
            "https://shop.test/reset-password?token=abc"
        );
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn reset_secret_is_never_logged() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let notifier = LogNotifier::new("https://shop.test");
        notifier
            .send_password_reset("a@b.com", "s3cr3t-reset-value", Utc::now())
            .await
            .unwrap();

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("password reset requested"));
        assert!(output.contains("a@b.com"));
        assert!(!output.contains("s3cr3t-reset-value"));
        assert!(!output.contains("reset-password?token="));
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        let notifier = LogNotifier::new("http://localhost:3000");
        notifier
            .send_password_reset("a@b.com", "abc", Utc::now())
            .await
            .unwrap();
    }
}
