//! Intake conversation state machine
//!
//! Routing is a pure function from (stored state, inbound message) to an
//! [`Outcome`]: the next state plus the effects the runtime must carry out.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{CollectedField, Effect};
pub use event::InboundEvent;
pub use state::{ConversationRecord, IntakeState};
pub use transition::{dispatch, route, Outcome};
