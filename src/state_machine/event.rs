//! Inbound messages that drive the conversation

/// One received SMS/MMS, already keyed by normalized phone number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub phone: String,
    pub text: String,
    pub attachment_count: u32,
    /// First attachment URL, if the carrier supplied one
    pub media_url: Option<String>,
}

impl InboundEvent {
    /// A plain text message without attachments.
    pub fn text(phone: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            text: text.into(),
            attachment_count: 0,
            media_url: None,
        }
    }

    pub fn with_attachments(mut self, count: u32) -> Self {
        self.attachment_count = count;
        self
    }

    pub fn with_media_url(mut self, url: impl Into<String>) -> Self {
        self.media_url = Some(url.into());
        self
    }
}
