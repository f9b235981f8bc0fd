//! Twilio Programmable Messaging gateway

use super::{OutboundSms, RetryPolicy, SendError};
use crate::runtime::MessagingGateway;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.twilio.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials for the Twilio REST API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Overridable for tests and regional endpoints
    pub api_base: String,
}

impl TwilioConfig {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }
}

pub struct TwilioGateway {
    client: Client,
    config: TwilioConfig,
}

impl TwilioGateway {
    pub fn new(config: TwilioConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    async fn send_once(&self, sms: &OutboundSms) -> Result<(), SendError> {
        let form = [
            ("To", sms.to.as_str()),
            ("From", sms.from.as_str()),
            ("Body", sms.body.as_str()),
        ];

        let response = self
            .client
            .post(self.config.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SendError::network(format!("Request timeout: {e}"))
                } else {
                    SendError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SendError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        match serde_json::from_str::<MessageResource>(&body) {
            Ok(message) => tracing::debug!(
                sid = %message.sid,
                status = message.status.as_deref().unwrap_or("unknown"),
                "Twilio accepted message"
            ),
            Err(e) => tracing::debug!(error = %e, "Twilio response without message resource"),
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for TwilioGateway {
    async fn send(&self, sms: &OutboundSms, policy: &RetryPolicy) -> Result<(), SendError> {
        policy.run(|_| self.send_once(sms)).await
    }
}

fn classify_error(status: reqwest::StatusCode, body: &str) -> SendError {
    let message = serde_json::from_str::<TwilioErrorBody>(body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.to_string());

    match status.as_u16() {
        401 | 403 => SendError::auth(format!("Authentication failed: {message}")),
        429 => SendError::rate_limit(format!("Rate limited: {message}")),
        500..=599 => SendError::server_error(format!("Server error: {message}")),
        _ => SendError::invalid_request(format!("HTTP {status}: {message}")),
    }
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: Option<String>,
}
