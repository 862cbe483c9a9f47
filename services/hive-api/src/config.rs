//! Configuration for the Hive API service.

use std::time::Duration;

use hive_core::LifecycleConfig;

/// Outbound email relay settings
#[derive(Clone)]
pub struct MailConfig {
    pub relay_url: String,
    pub api_key: String,
    pub from: String,
}

/// Hive API configuration
#[derive(Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Bearer token expected on `/api/cron/*`
    pub cron_secret: String,
    /// Bearer token expected on `/api/v1/*`
    pub internal_api_token: String,
    /// Billing webhook signing secret
    pub webhook_secret: String,
    /// Email relay; emails are only logged when unset
    pub mail: Option<MailConfig>,
    /// Redirect every outgoing email to this address (development)
    pub dev_email_override: Option<String>,
    /// Lifecycle settings
    pub lifecycle: LifecycleConfig,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        // Secrets have no defaults
        let cron_secret = optional("CRON_SECRET").ok_or(ConfigError::Missing("CRON_SECRET"))?;
        let internal_api_token =
            optional("INTERNAL_API_TOKEN").ok_or(ConfigError::Missing("INTERNAL_API_TOKEN"))?;
        let webhook_secret = optional("BILLING_WEBHOOK_SECRET")
            .ok_or(ConfigError::Missing("BILLING_WEBHOOK_SECRET"))?;

        let mail = match optional("MAIL_RELAY_URL") {
            Some(relay_url) => Some(MailConfig {
                relay_url,
                api_key: optional("MAIL_API_KEY").ok_or(ConfigError::Missing("MAIL_API_KEY"))?,
                from: optional("MAIL_FROM")
                    .unwrap_or_else(|| "Hive <notifications@hiveos.app>".to_string()),
            }),
            None => None,
        };

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        let mut lifecycle = match optional("APP_URL") {
            Some(url) => LifecycleConfig::new(url),
            None => LifecycleConfig::default(),
        };
        if let Some(hours) = optional("GRACE_PERIOD_HOURS") {
            let hours: i64 = hours
                .parse()
                .map_err(|_| ConfigError::Invalid("GRACE_PERIOD_HOURS"))?;
            lifecycle = lifecycle.with_grace_period(chrono::Duration::hours(hours));
        }

        Ok(Self {
            http_port,
            database_url,
            cron_secret,
            internal_api_token,
            webhook_secret,
            mail,
            dev_email_override: optional("DEV_EMAIL_OVERRIDE"),
            lifecycle,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("http_port", &self.http_port)
            .field("mail_relay", &self.mail.as_ref().map(|m| &m.relay_url))
            .field("dev_email_override", &self.dev_email_override)
            .field("lifecycle", &self.lifecycle)
            .field("request_timeout", &self.request_timeout)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish_non_exhaustive()
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
