//! Best-effort notification dispatch
//!
//! Every lifecycle email goes through [`Notifier::send_best_effort`]. A
//! failed or stalled send is logged and counted, and never reaches the
//! caller, so data changes made before the send always stand.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::mailer::{EmailMessage, Mailer};

/// Failure-isolated wrapper around a [`Mailer`]
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, timeout: Duration) -> Self {
        Self { mailer, timeout }
    }

    /// Send `message`, returning whether it was accepted by the transport
    pub async fn send_best_effort(&self, kind: &'static str, message: EmailMessage) -> bool {
        let outcome = tokio::time::timeout(self.timeout, self.mailer.send(&message)).await;

        match outcome {
            Ok(Ok(())) => {
                debug!(kind, to = %message.to, "Notification sent");
                metrics::counter!("hive_notifications_sent_total", "kind" => kind).increment(1);
                true
            }
            Ok(Err(e)) => {
                warn!(kind, to = %message.to, error = %e, "Notification failed");
                metrics::counter!("hive_notifications_failed_total", "kind" => kind).increment(1);
                false
            }
            Err(_) => {
                warn!(kind, to = %message.to, timeout = ?self.timeout, "Notification timed out");
                metrics::counter!("hive_notifications_failed_total", "kind" => kind).increment(1);
                false
            }
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MailError;
    use async_trait::async_trait;

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _message: &EmailMessage) -> Result<(), MailError> {
            Err(MailError::Transport("connection refused".to_string()))
        }
    }

    struct StalledMailer;

    #[async_trait]
    impl Mailer for StalledMailer {
        async fn send(&self, _message: &EmailMessage) -> Result<(), MailError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn message() -> EmailMessage {
        EmailMessage {
            to: "x@example.com".to_string(),
            subject: "s".to_string(),
            text: "t".to_string(),
            html: None,
        }
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let notifier = Notifier::new(Arc::new(FailingMailer), Duration::from_secs(1));
        assert!(!notifier.send_best_effort("test", message()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_send_times_out() {
        let notifier = Notifier::new(Arc::new(StalledMailer), Duration::from_millis(50));
        assert!(!notifier.send_best_effort("test", message()).await);
    }
}
