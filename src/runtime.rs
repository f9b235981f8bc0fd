//! Runtime for handling inbound messages
//!
//! The engine looks up the stored state, routes the message through the
//! pure state machine, carries out the resulting effects, and acknowledges
//! the triggering request exactly once.

mod executor;
mod locks;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{EngineError, IntakeEngine};
pub use traits::*;

use crate::replies::{ACK_PROCESSED, ACK_RECEIVED};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Type alias for the production engine with concrete implementations
pub type ProductionEngine = IntakeEngine<DatabaseStore, Arc<dyn MessagingGateway>>;

/// Content type of every acknowledgement body
pub const ACK_CONTENT_TYPE: &str = "text/plain";

/// Synchronous answer to the request that delivered an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// The message went through the whole pipeline
    Processed,
    /// Something failed; the body makes no claim of success
    Received,
}

impl Acknowledgement {
    pub fn body(self) -> &'static str {
        match self {
            Acknowledgement::Processed => ACK_PROCESSED,
            Acknowledgement::Received => ACK_RECEIVED,
        }
    }

    pub fn content_type(self) -> &'static str {
        ACK_CONTENT_TYPE
    }
}

/// Single-use handle for acknowledging one inbound request.
///
/// `respond` consumes the responder, so a second acknowledgement does not
/// compile and the engine must hand it back on every path.
#[derive(Debug)]
pub struct Responder {
    tx: oneshot::Sender<Acknowledgement>,
}

impl Responder {
    pub fn channel() -> (Self, oneshot::Receiver<Acknowledgement>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn respond(self, ack: Acknowledgement) {
        if self.tx.send(ack).is_err() {
            tracing::debug!(?ack, "Requester gone before acknowledgement");
        }
    }
}
