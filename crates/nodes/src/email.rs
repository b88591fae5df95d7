//! Outbound email.
//!
//! Two transports implement [`EmailSender`]: [`InMemoryEmailSender`] keeps
//! every message for later inspection, [`HttpEmailSender`] hands it to an
//! HTTP relay. Each call either fully succeeds or fails.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::NodeError;

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// # Errors
    /// [`NodeError::InvalidRecipient`] / [`NodeError::InvalidSubject`] for
    /// empty fields; [`NodeError::Delivery`] if the transport fails.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NodeError>;
}

fn check_envelope(to: &str, subject: &str) -> Result<(), NodeError> {
    if to.trim().is_empty() {
        return Err(NodeError::InvalidRecipient);
    }
    if subject.trim().is_empty() {
        return Err(NodeError::InvalidSubject);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory capture
// ---------------------------------------------------------------------------

/// A message captured by [`InMemoryEmailSender`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

/// Records messages instead of delivering them. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmailSender {
    sent: Arc<Mutex<Vec<SentEmail>>>,
}

impl InMemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, Vec<SentEmail>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All captured messages, oldest first.
    pub fn sent(&self) -> Vec<SentEmail> {
        self.log().clone()
    }

    pub fn clear(&self) {
        self.log().clear();
    }
}

#[async_trait]
impl EmailSender for InMemoryEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NodeError> {
        check_envelope(to, subject)?;

        let email = SentEmail {
            to: to.to_owned(),
            subject: subject.to_owned(),
            body: body.to_owned(),
            timestamp: Utc::now(),
        };
        let mut log = self.log();
        log.push(email);

        info!(to, subject, total = log.len(), "email captured in memory");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HTTP relay
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RelayMessage<'a> {
    to: &'a str,
    from: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// POSTs each message as JSON to a mail relay endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmailSender {
    client: reqwest::Client,
    relay_url: String,
    from: String,
}

impl HttpEmailSender {
    pub fn new(
        relay_url: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NodeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeError::Delivery(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            relay_url: relay_url.into(),
            from: from.into(),
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NodeError> {
        check_envelope(to, subject)?;

        let message = RelayMessage {
            to,
            from: &self.from,
            subject,
            body,
        };
        let resp = self
            .client
            .post(&self.relay_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| NodeError::Delivery(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(NodeError::Delivery(format!(
                "relay responded with status {}: {}",
                status.as_u16(),
                text
            )));
        }

        info!(to, subject, relay = %self.relay_url, "email handed to relay");
        Ok(())
    }
}
