//! Effects produced by routing

use super::state::IntakeState;
use crate::replies::ReplyKind;
use serde::Serialize;

/// The answer a successful check contributes to the record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum CollectedField {
    PostalCode(String),
    EnergyKwh(f64),
    PhotoReceived,
}

impl CollectedField {
    /// The state whose question this field answers.
    pub fn collected_in(&self) -> IntakeState {
        match self {
            CollectedField::PostalCode(_) => IntakeState::AwaitingPlz,
            CollectedField::EnergyKwh(_) => IntakeState::AwaitingKwh,
            CollectedField::PhotoReceived => IntakeState::AwaitingPhoto,
        }
    }
}

/// Effects to be executed, in order, after routing
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Persist the new state and the collected field
    Commit {
        next_state: IntakeState,
        field: Option<CollectedField>,
    },

    /// Send one SMS back to the user
    SendReply { reply: ReplyKind },

    /// Mark the number as opted out; nothing is ever sent to it again
    OptOut,
}

impl Effect {
    pub fn commit(next_state: IntakeState, field: Option<CollectedField>) -> Self {
        Effect::Commit { next_state, field }
    }

    pub fn send_reply(reply: ReplyKind) -> Self {
        Effect::SendReply { reply }
    }
}
