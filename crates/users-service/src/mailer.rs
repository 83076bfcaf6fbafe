//! Outbound email seam.
//!
//! The platform only logs today; the trait is the swap point for a real
//! provider.

use async_trait::async_trait;
use tracing::info;

/// Sends notification email to users.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the welcome email for a newly registered user.
    async fn send_welcome(&self, name: &str, surname: &str);
}

/// Stub mailer that records the send in the log and does nothing else.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_welcome(&self, name: &str, surname: &str) {
        info!(name = name, surname = surname, "sending email");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_mailer_does_not_panic() {
        LogMailer.send_welcome("Ada", "Lovelace").await;
    }
}
