//! Pure routing function
//!
//! Given the same stored state and message, `route` always produces the same
//! outcome and performs no I/O.

use super::{CollectedField, ConversationRecord, Effect, InboundEvent, IntakeState};
use crate::replies::{self, ReplyKind};
use crate::validate;

/// Result of routing one inbound message
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub next_state: IntakeState,
    pub effects: Vec<Effect>,
}

impl Outcome {
    pub fn new(state: IntakeState) -> Self {
        Self {
            next_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// Whether a commit is required.
    pub fn commits(&self) -> bool {
        self.effects.iter().any(|e| matches!(e, Effect::Commit { .. }))
    }

    /// The reply this outcome sends, if any.
    pub fn reply(&self) -> Option<ReplyKind> {
        self.effects.iter().find_map(|e| match e {
            Effect::SendReply { reply } => Some(*reply),
            Effect::Commit { .. } | Effect::OptOut => None,
        })
    }
}

/// Route a message against a stored record.
///
/// Opted-out numbers get no effects at all. An opt-out keyword wins over
/// every state-specific check and is never answered. A completed record is
/// never written again, and it is never messaged either.
pub fn dispatch(record: &ConversationRecord, event: &InboundEvent) -> Outcome {
    if record.opted_out {
        return Outcome::new(record.state);
    }
    if !record.state.is_terminal() && validate::is_opt_out(&event.text) {
        return Outcome::new(record.state).with_effect(Effect::OptOut);
    }
    route(record.state, event)
}

/// Route a message against the stored state.
pub fn route(state: IntakeState, event: &InboundEvent) -> Outcome {
    match state {
        IntakeState::Initial => {
            if validate::is_affirmative(&event.text) {
                advance(state, None)
            } else {
                reject(state)
            }
        }

        IntakeState::AwaitingPlz => match validate::postal_code(&event.text) {
            Some(plz) => advance(state, Some(CollectedField::PostalCode(plz))),
            None => reject(state),
        },

        IntakeState::AwaitingKwh => match validate::consumption(&event.text) {
            Some(kwh) => advance(state, Some(CollectedField::EnergyKwh(kwh))),
            None => reject(state),
        },

        IntakeState::AwaitingPhoto => {
            if validate::has_photo(event.attachment_count) {
                advance(state, Some(CollectedField::PhotoReceived))
            } else {
                reject(state)
            }
        }

        // Terminal: nothing written, nothing sent
        IntakeState::Complete => Outcome::new(state),
    }
}

/// Check passed: commit first, then reply.
fn advance(state: IntakeState, field: Option<CollectedField>) -> Outcome {
    let Some(next_state) = state.next() else {
        return Outcome::new(state);
    };
    Outcome::new(next_state)
        .with_effect(Effect::commit(next_state, field))
        .with_effects(replies::compose(state, true).map(Effect::send_reply))
}

/// Check failed: state unchanged, error prompt only.
fn reject(state: IntakeState) -> Outcome {
    Outcome::new(state).with_effects(replies::compose(state, false).map(Effect::send_reply))
}
