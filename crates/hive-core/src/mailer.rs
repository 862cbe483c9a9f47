//! Outbound email
//!
//! Lifecycle code talks to a [`Mailer`]; the transport behind it is chosen at
//! startup. Call sites treat every send as best-effort (see [`crate::notify`]).

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// A rendered email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// Mail transport errors
#[derive(Error, Debug)]
pub enum MailError {
    /// Request could not be delivered to the transport
    #[error("mail transport error: {0}")]
    Transport(String),

    /// Transport answered with a failure status
    #[error("mail relay rejected message with status {status}")]
    Rejected {
        /// HTTP status returned by the relay
        status: u16,
    },
}

/// Email transport
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

#[async_trait]
impl<M: Mailer + ?Sized> Mailer for Arc<M> {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        (**self).send(message).await
    }
}

/// Mailer used when no transport is configured: the message is only logged
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Email transport not configured, message logged"
        );
        debug!(body = %message.text, "Logged email body");
        Ok(())
    }
}

/// Mailer posting JSON to an HTTP mail relay
#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    #[serde(flatten)]
    message: &'a EmailMessage,
}

impl HttpMailer {
    /// Create a mailer for the relay at `endpoint`
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, message), fields(to = %message.to))]
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&RelayRequest {
                from: &self.from,
                message,
            })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Mail relay request failed");
                MailError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Mail relay error");
            return Err(MailError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!("Email handed to relay");
        Ok(())
    }
}

impl std::fmt::Debug for HttpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMailer")
            .field("endpoint", &self.endpoint)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

/// Redirects every message to one developer address
///
/// The original recipient is kept visible in the subject and at the top of
/// the body so redirected mail can still be told apart.
#[derive(Debug, Clone)]
pub struct DevOverrideMailer<M> {
    inner: M,
    override_to: String,
}

impl<M: Mailer> DevOverrideMailer<M> {
    pub fn new(inner: M, override_to: impl Into<String>) -> Self {
        Self {
            inner,
            override_to: override_to.into(),
        }
    }

    fn redirect(&self, message: &EmailMessage) -> EmailMessage {
        let original = &message.to;
        EmailMessage {
            to: self.override_to.clone(),
            subject: format!("[DEV - To: {original}] {}", message.subject),
            text: format!("ORIGINAL RECIPIENT: {original}\n\n{}", message.text),
            html: message.html.as_ref().map(|html| {
                format!("<p><strong>ORIGINAL RECIPIENT:</strong> {original}</p><hr>{html}")
            }),
        }
    }
}

#[async_trait]
impl<M: Mailer> Mailer for DevOverrideMailer<M> {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        debug!(original = %message.to, to = %self.override_to, "Redirecting email");
        self.inner.send(&self.redirect(message)).await
    }
}
