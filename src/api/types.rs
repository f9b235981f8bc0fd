//! API request and response types

use crate::phone::normalize_phone;
use crate::state_machine::{ConversationRecord, InboundEvent};
use serde::{Deserialize, Serialize};

/// Inbound message webhook as posted by Twilio (form encoded).
///
/// Only the fields the intake needs; everything else is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct InboundSmsForm {
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "NumMedia")]
    pub num_media: Option<String>,
    #[serde(rename = "MediaUrl0")]
    pub media_url0: Option<String>,
}

impl InboundSmsForm {
    /// Attachment count; missing or garbled values count as none
    pub fn attachment_count(&self) -> u32 {
        self.num_media
            .as_deref()
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Convert to an engine event, `None` without a usable sender number
    pub fn into_event(self) -> Option<InboundEvent> {
        let phone = normalize_phone(self.from.as_deref()?)?;
        let attachments = self.attachment_count();
        let mut event = InboundEvent::text(phone, self.body).with_attachments(attachments);
        if let Some(url) = self.media_url0.filter(|u| !u.is_empty()) {
            event = event.with_media_url(url);
        }
        Some(event)
    }
}

/// Stored conversation as returned by the inspection endpoint
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation: ConversationRecord,
    pub complete: bool,
}

impl From<ConversationRecord> for ConversationResponse {
    fn from(conversation: ConversationRecord) -> Self {
        Self {
            complete: conversation.state.is_terminal(),
            conversation,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
