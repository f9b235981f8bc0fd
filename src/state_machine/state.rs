//! Intake state and the per-phone record

use super::effect::CollectedField;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a phone number stands in the intake questions.
///
/// Progresses linearly: Initial → `AwaitingPlz` → `AwaitingKwh` →
/// `AwaitingPhoto` → Complete. Variant order is sequence order, so the
/// derived `Ord` compares progress.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IntakeState {
    #[default]
    Initial,
    AwaitingPlz,
    AwaitingKwh,
    AwaitingPhoto,
    Complete,
}

impl IntakeState {
    pub const ALL: [IntakeState; 5] = [
        IntakeState::Initial,
        IntakeState::AwaitingPlz,
        IntakeState::AwaitingKwh,
        IntakeState::AwaitingPhoto,
        IntakeState::Complete,
    ];

    /// Whether the conversation is finished.
    pub fn is_terminal(self) -> bool {
        matches!(self, IntakeState::Complete)
    }

    /// The state reached when this state's check passes.
    pub fn next(self) -> Option<IntakeState> {
        match self {
            IntakeState::Initial => Some(IntakeState::AwaitingPlz),
            IntakeState::AwaitingPlz => Some(IntakeState::AwaitingKwh),
            IntakeState::AwaitingKwh => Some(IntakeState::AwaitingPhoto),
            IntakeState::AwaitingPhoto => Some(IntakeState::Complete),
            IntakeState::Complete => None,
        }
    }

    /// Value stored in the `conversation_state` column.
    pub fn as_wire_str(self) -> &'static str {
        match self {
            IntakeState::Initial => "initial",
            IntakeState::AwaitingPlz => "awaiting_plz",
            IntakeState::AwaitingKwh => "awaiting_kwh",
            IntakeState::AwaitingPhoto => "awaiting_foto",
            IntakeState::Complete => "qualified_complete",
        }
    }

    /// Parse a stored state value. Unknown values yield `None`.
    ///
    /// An empty value and `sms_sent` (opt-in SMS delivered, no answer yet)
    /// both mean the questions have not started.
    pub fn from_wire(value: &str) -> Option<IntakeState> {
        match value {
            "" | "initial" | "sms_sent" => Some(IntakeState::Initial),
            "awaiting_plz" => Some(IntakeState::AwaitingPlz),
            "awaiting_kwh" => Some(IntakeState::AwaitingKwh),
            "awaiting_foto" => Some(IntakeState::AwaitingPhoto),
            "qualified_complete" => Some(IntakeState::Complete),
            _ => None,
        }
    }
}

impl fmt::Display for IntakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

/// Persisted progress for one phone number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub phone: String,
    pub state: IntakeState,
    pub postal_code: Option<String>,
    pub energy_kwh: Option<f64>,
    pub photo_received: Option<bool>,
    /// The number asked to stop; it never gets another message.
    #[serde(default)]
    pub opted_out: bool,
    /// Bumped on every commit; 0 means the record was never written.
    pub version: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConversationRecord {
    /// A record for a phone that has never been seen.
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            state: IntakeState::Initial,
            postal_code: None,
            energy_kwh: None,
            photo_received: None,
            opted_out: false,
            version: 0,
            updated_at: None,
        }
    }

    /// Apply a committed transition in memory.
    ///
    /// Entering `AwaitingPlz` starts the questions over, so answers left from
    /// an unreadable earlier state are dropped.
    pub fn apply(&mut self, next_state: IntakeState, field: Option<&CollectedField>) {
        if next_state == IntakeState::AwaitingPlz {
            self.clear_answers();
        }
        match field {
            Some(CollectedField::PostalCode(plz)) => self.postal_code = Some(plz.clone()),
            Some(CollectedField::EnergyKwh(kwh)) => self.energy_kwh = Some(*kwh),
            Some(CollectedField::PhotoReceived) => self.photo_received = Some(true),
            None => {}
        }
        self.state = next_state;
        self.version += 1;
        self.updated_at = Some(Utc::now());
    }

    /// Apply a committed opt-out in memory. State and answers are kept.
    pub fn opt_out(&mut self) {
        self.opted_out = true;
        self.version += 1;
        self.updated_at = Some(Utc::now());
    }

    fn clear_answers(&mut self) {
        self.postal_code = None;
        self.energy_kwh = None;
        self.photo_received = None;
    }

    /// A field is set exactly when the state has moved past its question.
    pub fn fields_match_state(&self) -> bool {
        self.postal_code.is_some() == (self.state > IntakeState::AwaitingPlz)
            && self.energy_kwh.is_some() == (self.state > IntakeState::AwaitingKwh)
            && self.photo_received.is_some() == (self.state > IntakeState::AwaitingPhoto)
    }
}
