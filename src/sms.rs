//! Outbound SMS delivery
//!
//! The engine only sees the `MessagingGateway` trait; this module provides
//! the Twilio implementation, a log-only fallback, and the retry policy.

mod retry;
mod twilio;

pub use retry::RetryPolicy;
pub use twilio::{TwilioConfig, TwilioGateway};

use crate::runtime::MessagingGateway;
use async_trait::async_trait;
use thiserror::Error;

/// One outbound text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSms {
    pub to: String,
    pub from: String,
    pub body: String,
}

/// Delivery failure, classified for retry decisions
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SendError {
    pub kind: SendErrorKind,
    pub message: String,
    /// Attempts made before giving up (filled in by the retry loop)
    pub attempts: u32,
}

impl SendError {
    pub fn new(kind: SendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts: 1,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(SendErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(SendErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(SendErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(SendErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SendErrorKind::InvalidRequest, message)
    }

    #[must_use]
    pub fn after_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

/// Error classification for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendErrorKind {
    /// Connection failures, timeouts - retryable
    Network,
    /// Rate limited (429) - retryable
    RateLimit,
    /// Server error (5xx) - retryable
    ServerError,
    /// Authentication failed (401, 403) - not retryable
    Auth,
    /// Rejected request, e.g. invalid number (400) - not retryable
    InvalidRequest,
}

impl SendErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}

/// Gateway used when no SMS provider is configured: logs and drops.
pub struct LogOnlyGateway;

#[async_trait]
impl MessagingGateway for LogOnlyGateway {
    async fn send(&self, sms: &OutboundSms, _policy: &RetryPolicy) -> Result<(), SendError> {
        tracing::info!(to = %sms.to, from = %sms.from, body = %sms.body, "SMS not sent (no provider configured)");
        Ok(())
    }
}
