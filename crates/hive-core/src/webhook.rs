//! Billing provider webhooks
//!
//! Payloads are signed with HMAC-SHA256 over `"{timestamp}.{body}"` and
//! carried in a `t=<unix seconds>,v1=<hex digest>` header. Only invoice
//! events change account state here.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::error::LifecycleError;
use crate::lifecycle::SubscriptionService;

/// Maximum age of a signed payload, in seconds
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Webhook verification errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
    #[error("missing timestamp in signature header")]
    MissingTimestamp,

    #[error("missing v1 signature in signature header")]
    MissingSignature,

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("timestamp outside tolerance")]
    StaleTimestamp,

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("webhook secret rejected by HMAC")]
    InvalidSecret,
}

/// Billing events the service acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    /// A renewal invoice was paid
    InvoicePaid { subscription_id: String },
    /// A renewal invoice could not be charged
    InvoicePaymentFailed { subscription_id: String },
    /// Anything else; acknowledged and ignored
    Ignored(String),
}

impl BillingEvent {
    pub fn kind(&self) -> &str {
        match self {
            Self::InvoicePaid { .. } => "invoice.paid",
            Self::InvoicePaymentFailed { .. } => "invoice.payment_failed",
            Self::Ignored(kind) => kind,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawInvoice {
    subscription: Option<String>,
}

/// Verifies and dispatches billing webhooks
#[derive(Clone)]
pub struct BillingWebhook {
    secret: String,
}

impl BillingWebhook {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Hex HMAC of `"{timestamp}.{payload}"`
    pub fn sign(&self, timestamp: i64, payload: &[u8]) -> Result<String, WebhookError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .map_err(|_| WebhookError::InvalidSecret)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Verify the signature header and parse the event
    #[instrument(skip(self, payload, signature))]
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<BillingEvent, WebhookError> {
        self.verify_signature(payload, signature, Utc::now().timestamp())?;

        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::Malformed(e.to_string()))?;
        debug!(event_id = %raw.id, event_type = %raw.event_type, "Parsed webhook event");

        match raw.event_type.as_str() {
            "invoice.paid" | "invoice.payment_failed" => {
                let invoice: RawInvoice = serde_json::from_value(raw.data.object)
                    .map_err(|e| WebhookError::Malformed(e.to_string()))?;
                let Some(subscription_id) = invoice.subscription else {
                    return Ok(BillingEvent::Ignored(raw.event_type));
                };
                Ok(if raw.event_type == "invoice.paid" {
                    BillingEvent::InvoicePaid { subscription_id }
                } else {
                    BillingEvent::InvoicePaymentFailed { subscription_id }
                })
            }
            _ => Ok(BillingEvent::Ignored(raw.event_type)),
        }
    }

    fn verify_signature(
        &self,
        payload: &[u8],
        signature: &str,
        now: i64,
    ) -> Result<(), WebhookError> {
        let mut timestamp = None;
        let mut sig_v1 = None;

        for part in signature.split(',') {
            if let Some((key, value)) = part.trim().split_once('=') {
                match key {
                    "t" => timestamp = Some(value),
                    "v1" => sig_v1 = Some(value),
                    _ => {}
                }
            }
        }

        let timestamp: i64 = timestamp
            .ok_or(WebhookError::MissingTimestamp)?
            .parse()
            .map_err(|_| WebhookError::MissingTimestamp)?;
        let sig_v1 = sig_v1.ok_or(WebhookError::MissingSignature)?;

        let expected = self.sign(timestamp, payload)?;
        if !bool::from(sig_v1.as_bytes().ct_eq(expected.as_bytes())) {
            warn!("Webhook signature verification failed");
            return Err(WebhookError::InvalidSignature);
        }

        if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
            warn!(timestamp, now, "Webhook timestamp outside tolerance");
            return Err(WebhookError::StaleTimestamp);
        }

        Ok(())
    }

    /// Apply a verified event
    pub async fn dispatch(
        &self,
        event: &BillingEvent,
        subscriptions: &SubscriptionService,
    ) -> Result<(), LifecycleError> {
        match event {
            BillingEvent::InvoicePaid { subscription_id } => {
                subscriptions.handle_subscription_renewed(subscription_id).await
            }
            BillingEvent::InvoicePaymentFailed { subscription_id } => {
                subscriptions.handle_payment_failed(subscription_id).await
            }
            BillingEvent::Ignored(kind) => {
                info!(kind = %kind, "Ignoring webhook event");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for BillingWebhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingWebhook").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] =
        br#"{"id":"evt_1","type":"invoice.paid","data":{"object":{"subscription":"sub_1"}}}"#;

    #[test]
    fn test_valid_signature_parses_event() {
        let webhook = BillingWebhook::new("whsec_test");
        let now = Utc::now().timestamp();
        let header = format!("t={now},v1={}", webhook.sign(now, PAYLOAD).unwrap());

        let event = webhook.verify_and_parse(PAYLOAD, &header).unwrap();
        assert_eq!(
            event,
            BillingEvent::InvoicePaid {
                subscription_id: "sub_1".to_string()
            }
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let now = Utc::now().timestamp();
        let forged = BillingWebhook::new("other").sign(now, PAYLOAD).unwrap();
        let header = format!("t={now},v1={forged}");

        assert_eq!(
            BillingWebhook::new("whsec_test").verify_and_parse(PAYLOAD, &header),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let webhook = BillingWebhook::new("whsec_test");
        let then = Utc::now().timestamp() - SIGNATURE_TOLERANCE_SECS - 60;
        let header = format!("t={then},v1={}", webhook.sign(then, PAYLOAD).unwrap());

        assert_eq!(
            webhook.verify_and_parse(PAYLOAD, &header),
            Err(WebhookError::StaleTimestamp)
        );
    }

    #[test]
    fn test_header_parts_required() {
        let webhook = BillingWebhook::new("whsec_test");
        assert_eq!(
            webhook.verify_and_parse(PAYLOAD, "v1=abc"),
            Err(WebhookError::MissingTimestamp)
        );
        assert_eq!(
            webhook.verify_and_parse(PAYLOAD, "t=123"),
            Err(WebhookError::MissingSignature)
        );
    }

    #[test]
    fn test_unhandled_event_is_ignored() {
        let webhook = BillingWebhook::new("whsec_test");
        let payload = br#"{"id":"evt_2","type":"customer.created","data":{"object":{}}}"#;
        let now = Utc::now().timestamp();
        let header = format!("t={now},v1={}", webhook.sign(now, payload).unwrap());

        assert_eq!(
            webhook.verify_and_parse(payload, &header),
            Ok(BillingEvent::Ignored("customer.created".to_string()))
        );
    }
}
