//! Outbound SMS texts for each step of the intake conversation

use crate::state_machine::IntakeState;
use serde::Serialize;

/// Acknowledgement body when the message was handled end to end.
pub const ACK_PROCESSED: &str = "Nachricht verarbeitet.";

/// Acknowledgement body when handling failed; makes no claim of success.
pub const ACK_RECEIVED: &str = "Nachricht empfangen.";

/// The fixed set of replies the conversation can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    /// Message in `Initial` without the affirmative token
    NotStarted,
    AskPostalCode,
    InvalidPostalCode,
    AskConsumption,
    InvalidConsumption,
    AskPhoto,
    InvalidPhoto,
    Completed,
}

impl ReplyKind {
    pub const ALL: [ReplyKind; 8] = [
        ReplyKind::NotStarted,
        ReplyKind::AskPostalCode,
        ReplyKind::InvalidPostalCode,
        ReplyKind::AskConsumption,
        ReplyKind::InvalidConsumption,
        ReplyKind::AskPhoto,
        ReplyKind::InvalidPhoto,
        ReplyKind::Completed,
    ];

    /// SMS body for this reply.
    pub fn body(self) -> &'static str {
        match self {
            ReplyKind::NotStarted => "Um zu starten, antworten Sie bitte mit JA.",
            ReplyKind::AskPostalCode => {
                "Willkommen! Bitte teilen Sie uns Ihre Postleitzahl mit (5-stellig)."
            }
            ReplyKind::InvalidPostalCode => "Bitte geben Sie eine gültige 5-stellige Postleitzahl ein.",
            ReplyKind::AskConsumption => "Danke! Wie hoch ist Ihr Jahresstromverbrauch in kWh?",
            ReplyKind::InvalidConsumption => "Bitte geben Sie eine gültige kWh-Zahl größer als 0 ein.",
            ReplyKind::AskPhoto => {
                "Alles klar! Bitte senden Sie uns ein Foto von Ihrem Stromzähler."
            }
            ReplyKind::InvalidPhoto => "Bitte senden Sie uns ein Foto Ihres Stromzählers.",
            ReplyKind::Completed => {
                "Vielen Dank! Wir haben alle Informationen erhalten. Wir melden uns bald bei Ihnen."
            }
        }
    }
}

/// Pick the reply for a message handled in `state`.
///
/// `accepted` is whether the state's check passed. `Complete` never replies.
pub fn compose(state: IntakeState, accepted: bool) -> Option<ReplyKind> {
    let reply = match (state, accepted) {
        (IntakeState::Initial, true) => ReplyKind::AskPostalCode,
        (IntakeState::Initial, false) => ReplyKind::NotStarted,
        (IntakeState::AwaitingPlz, true) => ReplyKind::AskConsumption,
        (IntakeState::AwaitingPlz, false) => ReplyKind::InvalidPostalCode,
        (IntakeState::AwaitingKwh, true) => ReplyKind::AskPhoto,
        (IntakeState::AwaitingKwh, false) => ReplyKind::InvalidConsumption,
        (IntakeState::AwaitingPhoto, true) => ReplyKind::Completed,
        (IntakeState::AwaitingPhoto, false) => ReplyKind::InvalidPhoto,
        (IntakeState::Complete, _) => return None,
    };
    Some(reply)
}
