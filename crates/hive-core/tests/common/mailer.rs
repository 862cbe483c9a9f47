//! Recording mailer for testing

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use hive_core::{EmailMessage, MailError, Mailer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Records every send attempt; fails for chosen recipients and can stall
#[derive(Default, Clone)]
pub struct RecordingMailer {
    attempts: Arc<DashMap<String, Vec<EmailMessage>>>,
    failing: Arc<DashSet<String>>,
    stall_ms: Arc<AtomicU64>,
}

#[allow(dead_code)]
impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `email` fail
    pub fn fail_for(&self, email: &str) {
        self.failing.insert(email.to_string());
    }

    /// Hold every send for `delay` before it completes
    pub fn stall_for(&self, delay: Duration) {
        self.stall_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Messages attempted for a recipient, including failed ones
    pub fn attempts_for(&self, email: &str) -> Vec<EmailMessage> {
        self.attempts
            .get(email)
            .map(|m| m.value().clone())
            .unwrap_or_default()
    }

    /// Total attempts across recipients
    pub fn total_attempts(&self) -> usize {
        self.attempts.iter().map(|e| e.value().len()).sum()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        self.attempts
            .entry(message.to.clone())
            .or_default()
            .push(message.clone());

        let stall = self.stall_ms.load(Ordering::SeqCst);
        if stall > 0 {
            tokio::time::sleep(Duration::from_millis(stall)).await;
        }

        if self.failing.contains(&message.to) {
            return Err(MailError::Transport("connection reset".to_string()));
        }
        Ok(())
    }
}
